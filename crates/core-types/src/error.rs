use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unrecognized {field} '{value}', expected one of: {expected}")]
    Unrecognized {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{0} is out of range")]
    Overflow(&'static str),
}
