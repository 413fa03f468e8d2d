//! Domain error types.

/// Top-level error type for fxsim.
///
/// Lookup misses (unknown position id, tick index out of range) are not
/// errors; those surface as `Option`/`bool` returns. Margin refusal is a
/// normal negative result, also not represented here.
#[derive(Debug, thiserror::Error)]
pub enum FxsimError {
    #[error("invalid {field}: {value} (must be positive)")]
    Validation { field: &'static str, value: f64 },

    #[error("order {order_id} fill exhausted after {attempts} attempts ({filled} of {requested} filled)")]
    FillExhausted {
        order_id: u64,
        attempts: usize,
        filled: f64,
        requested: f64,
    },

    #[error("average price requested with no filled volume on order {order_id}")]
    ZeroFilledVolume { order_id: u64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FxsimError> for std::process::ExitCode {
    fn from(err: &FxsimError) -> Self {
        let code: u8 = match err {
            FxsimError::Io(_) => 1,
            FxsimError::ConfigParse { .. } | FxsimError::ConfigInvalid { .. } => 2,
            FxsimError::Data { .. } => 3,
            FxsimError::Validation { .. } => 4,
            FxsimError::FillExhausted { .. } | FxsimError::ZeroFilledVolume { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
