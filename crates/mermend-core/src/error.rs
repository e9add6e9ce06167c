pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid render configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid render configuration value at `{path}`: expected {expected}")]
    InvalidConfigValue {
        path: String,
        expected: &'static str,
    },

    #[error("Malformed embed sentinel `{value}`: {reason}")]
    MalformedEmbed { value: String, reason: String },
}
