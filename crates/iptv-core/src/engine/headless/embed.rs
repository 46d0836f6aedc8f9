use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::load_error;
use crate::engine::{codes, EmbedFrame, EngineError};
use crate::loader::ManifestLoader;

/// Stands in for an embedded third-party player: the frame "loads" when its page does.
pub struct HeadlessEmbed {
    loader: Arc<dyn ManifestLoader>,
    removed: AtomicBool,
}

impl HeadlessEmbed {
    pub fn new(loader: Arc<dyn ManifestLoader>) -> Self {
        Self {
            loader,
            removed: AtomicBool::new(false),
        }
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbedFrame for HeadlessEmbed {
    async fn load(&self, src: &str) -> Result<(), EngineError> {
        if self.is_removed() {
            return Err(EngineError::interrupted());
        }
        let page = self.loader.load(src).await.map_err(load_error)?;
        if self.is_removed() {
            return Err(EngineError::interrupted());
        }
        debug!(src, bytes = page.len(), "Embed frame loaded");
        Ok(())
    }

    fn remove(&self) -> Result<(), EngineError> {
        if self.removed.swap(true, Ordering::SeqCst) {
            return Err(EngineError::fatal(codes::MEDIA_ABORTED, "Frame already removed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::loader::HttpLoader;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn frame() -> HeadlessEmbed {
        let loader = HttpLoader::new(Duration::from_secs(5), 0, Duration::from_millis(1)).unwrap();
        HeadlessEmbed::new(Arc::new(loader))
    }

    #[tokio::test]
    async fn loads_when_page_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embed/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        frame()
            .load(&format!("{}/embed/abc", server.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn page_error_fails_the_frame() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embed/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = frame()
            .load(&format!("{}/embed/missing", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::BAD_HTTP_STATUS);
    }

    #[tokio::test]
    async fn second_remove_reports_error() {
        let frame = frame();
        frame.remove().unwrap();
        assert!(frame.is_removed());
        assert!(frame.remove().is_err());
        assert_eq!(
            frame.load("http://unused/embed").await.unwrap_err().code,
            codes::LOAD_INTERRUPTED
        );
    }
}
