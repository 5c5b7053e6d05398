////////////////////////////////////////// ServiceError ///////////////////////////////////////////

/// The error body the policy service returns alongside a non-2xx status.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ServiceError {
    /// HTTP status as reported by the service.
    #[serde(default)]
    pub status: u16,
    /// Short reason phrase, e.g. "Not Found".
    #[serde(default)]
    pub error: String,
    /// Human-readable explanation suitable for display.
    #[serde(default)]
    pub message: String,
}

impl ServiceError {
    /// Create a ServiceError from its parts.
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    /// The "{status} - {error}" title used when notifying the user.
    pub fn title(&self) -> String {
        format!("{} - {}", self.status, self.error)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}: {}", self.status, self.error, self.message)
    }
}

////////////////////////////////////////// CatalogError ///////////////////////////////////////////

/// Errors that can occur when talking to the policy catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// The request could not be sent or the response could not be read.
    Http(reqwest::Error),
    /// The service answered with a non-2xx status.
    Service(ServiceError),
    /// The response body was not the expected JSON shape.
    Decode(serde_json::Error),
    /// The request was cancelled before it completed.
    Cancelled,
}

impl CatalogError {
    /// The service error body, if the service produced one.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            CatalogError::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Http(err) => write!(f, "policy service request failed: {err}"),
            CatalogError::Service(err) => write!(f, "policy service rejected request: {err}"),
            CatalogError::Decode(err) => {
                write!(f, "policy service returned malformed JSON: {err}\nSuggestion: check that the service URL points at the policy service")
            }
            CatalogError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Http(err) => Some(err),
            CatalogError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err)
    }
}

impl From<ServiceError> for CatalogError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

//////////////////////////////////////////// FormError ////////////////////////////////////////////

/// Errors raised by the form model and the policy transform.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[allow(missing_docs)]
pub enum FormError {
    /// A policy definition references a template the catalog does not know.
    UnknownTemplate { policy_template_id: String },
    /// A form section key does not correspond to any template.
    UnknownDefinitionKey { key: String },
}

impl FormError {
    /// Create an UnknownTemplate error.
    pub fn unknown_template(policy_template_id: impl Into<String>) -> Self {
        Self::UnknownTemplate {
            policy_template_id: policy_template_id.into(),
        }
    }

    /// Create an UnknownDefinitionKey error.
    pub fn unknown_definition_key(key: impl Into<String>) -> Self {
        Self::UnknownDefinitionKey { key: key.into() }
    }
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::UnknownTemplate { policy_template_id } => {
                write!(f, "policy references unknown template '{policy_template_id}'\nSuggestion: the template may have been deleted; refusing to load rather than drop its definition")
            }
            FormError::UnknownDefinitionKey { key } => {
                write!(f, "no template has key '{key}'")
            }
        }
    }
}

impl std::error::Error for FormError {}

/////////////////////////////////////////// SessionError //////////////////////////////////////////

/// Errors that can occur while driving a policy session.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum SessionError {
    /// The catalog failed a request.
    Catalog(CatalogError),
    /// The policy could not be turned into form state, or the form was misused.
    Form(FormError),
    /// The operation needs a loaded session.
    NotReady { state: String },
    /// Saving was refused because these sections fail validation.
    Invalid { sections: Vec<String> },
    /// The session was left before the response arrived; the response was discarded.
    Superseded,
    /// The operation does not apply to this interaction (e.g. deleting an unsaved policy).
    Unsupported { operation: String },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Catalog(err) => write!(f, "{err}"),
            SessionError::Form(err) => write!(f, "{err}"),
            SessionError::NotReady { state } => {
                write!(f, "session is {state}; wait for it to finish loading")
            }
            SessionError::Invalid { sections } => {
                write!(
                    f,
                    "every row needs a value for each field; incomplete sections: {}",
                    sections.join(", ")
                )
            }
            SessionError::Superseded => write!(f, "session was left before the request finished"),
            SessionError::Unsupported { operation } => {
                write!(f, "{operation} is not available here")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Catalog(err) => Some(err),
            SessionError::Form(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

impl From<FormError> for SessionError {
    fn from(err: FormError) -> Self {
        Self::Form(err)
    }
}
