use serde::Serialize;

/// Success line: `{"success": true, "message": ..., <body fields>}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, body: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            body,
        }
    }
}

/// Failure line: `{"success": false, "error": ..., "error_type": ..., <echoed input>}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse<C> {
    pub success: bool,
    pub error: String,
    pub error_type: &'static str,
    #[serde(flatten)]
    pub context: C,
}

impl<C> ErrorResponse<C> {
    pub fn new(error: impl Into<String>, error_type: &'static str, context: C) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_type,
            context,
        }
    }
}

/// Echoed input for operations addressed by uid
#[derive(Debug, Clone, Serialize)]
pub struct UidContext {
    pub uid: String,
}

/// Context for failures that have nothing to echo
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoContext {}
