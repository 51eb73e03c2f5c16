use thiserror::Error;
use tokio::task::JoinError;

/// Engine-level errors for snapshot aggregation
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Aggregation of {view} failed: {source}")]
    ViewFailed {
        view: &'static str,
        #[source]
        source: JoinError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn view_failure_names_the_view() {
        let source = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err = EngineError::ViewFailed {
            view: "top_products",
            source,
        };
        assert!(err.to_string().starts_with("Aggregation of top_products failed"));
    }
}
