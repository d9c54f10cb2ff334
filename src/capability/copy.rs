// src/capability/copy.rs

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::capability::{CapResult, Copier};
use crate::errors::CapabilityError;
use crate::fs::FileSystem;

/// Copies through the project's [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FsCopier {
    fs: Arc<dyn FileSystem>,
}

impl FsCopier {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Copier for FsCopier {
    fn copy<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, CapResult<()>> {
        Box::pin(async move {
            self.fs
                .copy(from, to)
                .map_err(|e| CapabilityError::Invalid(format!("{e:#}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn copies_into_missing_directories() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("./src/fonts/a.woff", b"font".to_vec());

        FsCopier::new(fs.clone())
            .copy(Path::new("./src/fonts/a.woff"), Path::new("./build/fonts/a.woff"))
            .await
            .unwrap();

        assert_eq!(fs.read(Path::new("./build/fonts/a.woff")).unwrap(), b"font");
        assert!(fs.is_dir(Path::new("./build/fonts")));
    }
}
