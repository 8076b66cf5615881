use serde::{Deserialize, Serialize};

/// Empty JSON body for endpoints that only signal success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}
