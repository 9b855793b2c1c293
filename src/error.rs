/// Everything that can go wrong while talking to a Crafty instance or normalizing its payloads. None of these are
/// fatal: callers log them at the narrowest scope (instance, server or field) and carry on.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authentication against {host} failed: {reason}")]
    Auth { host: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{host} answered with status {status:?}")]
    UpstreamStatus { host: String, status: String },

    #[error("cannot parse {what} from {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("invalid API base URL for {host}: {source}")]
    InvalidUrl {
        host: String,
        #[source]
        source: url::ParseError,
    },
}

impl Error {
    pub(crate) fn parse(what: &'static str, input: impl ToString) -> Self {
        Self::Parse {
            what,
            input: input.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
