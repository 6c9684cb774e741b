use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("numeric parse error in {field}: {source}")]
    ParseFloat {
        field: &'static str,
        #[source]
        source: std::num::ParseFloatError,
    },
}
