use thiserror::Error;

pub type PnpscResult<T> = Result<T, PnpscError>;

#[derive(Debug, Error)]
pub enum PnpscError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Structural errors, all caught at `NetModel` construction time.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("unknown place referenced: '{0}'")]
    UnknownPlace(String),

    #[error("unknown player referenced: '{0}'")]
    UnknownPlayer(String),

    #[error("place '{0}' has negative initial marking")]
    NegativeMarking(String),

    #[error("malformed control-rate entry '{0}': expected 'place=delta'")]
    MalformedControlRate(String),

    #[error("input and inhibitor arcs of transition '{0}' are not disjoint (place '{1}')")]
    OverlappingArcs(String, String),
}

/// Errors raised while driving the `Simulator`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot update unknown transition '{0}'")]
    UnknownTransition(String),

    #[error("cannot update unknown place '{0}'")]
    UnknownPlace(String),

    #[error("cannot update unknown player '{0}'")]
    UnknownPlayer(String),
}

/// Errors raised by the gym-style `Environment` contract.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("action length {given} does not match the {expected} rates controlled by '{player}'")]
    ActionLengthMismatch {
        player: String,
        expected: usize,
        given: usize,
    },

    #[error("unknown player '{0}'")]
    UnknownPlayer(String),
}

/// Errors raised while parsing a declarative net definition.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to parse net definition: {0}")]
    Json(#[from] serde_json::Error),
}
