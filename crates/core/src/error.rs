use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("quote type '{0}' is not valid; valid types: oficial, blue, mep, ccl, cripto, tarjeta, freelance")]
    UnknownQuoteType(String),
}
