use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Deployment environment the booth talks to.
#[derive(Clone, Default, Copy, PartialEq, Eq, Debug)]
pub enum Environment {
    /// Local stand-ins for both external services, for development.
    Local,
    /// The live SaaS endpoints.
    #[default]
    Production,
}

impl Environment {
    /// Base URL of the asynchronous inference API.
    pub fn inference_url(&self) -> String {
        match self {
            Environment::Local => "http://localhost:8089".to_string(),
            Environment::Production => "https://api.replicate.com".to_string(),
        }
    }

    /// Base URL of the image upload API.
    pub fn upload_url(&self) -> String {
        match self {
            Environment::Local => "http://localhost:8090".to_string(),
            Environment::Production => "https://api.cloudinary.com".to_string(),
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Local => write!(f, "Local"),
            Environment::Production => write!(f, "Production"),
        }
    }
}
