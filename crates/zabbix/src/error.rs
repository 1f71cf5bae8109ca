use zreport_core::error::CoreError;

/// Errors from the Zabbix JSON-RPC layer.
#[derive(Debug, thiserror::Error)]
pub enum ZabbixError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Zabbix answered with a non-2xx status code.
    #[error("Zabbix HTTP error ({status}): {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Zabbix answered with a JSON-RPC error object.
    #[error("Zabbix API error {code}: {message} {data}")]
    Api {
        code: i64,
        message: String,
        data: String,
    },

    /// The response did not have the expected shape.
    #[error("Malformed Zabbix response: {0}")]
    Malformed(String),
}

impl From<ZabbixError> for CoreError {
    fn from(err: ZabbixError) -> Self {
        CoreError::Remote(err.to_string())
    }
}
