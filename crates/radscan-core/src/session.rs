//! Session-scoped state: the credential and the agent built from it, created
//! once at startup and passed to every operation.

use crate::agent::Agent;
use crate::env;
use crate::error::{Error, Result};
use crate::imaging::ImageArtifact;
use std::path::Path;

/// Everything a session holds. The credential is read once; the agent is
/// either fully configured or absent.
#[derive(Debug, Clone)]
pub struct Session {
    credential: Option<String>,
    agent: Option<Agent>,
}

impl Session {
    /// Reads the environment (with a `.env` file beside `base_path` filling
    /// in gaps) and builds the agent if a credential is present.
    pub fn initialize(base_path: &Path) -> Self {
        Session::from_credential(env::resolve_credential(base_path))
    }

    /// Builds a session from an already-resolved credential.
    pub fn from_credential(credential: Option<String>) -> Self {
        let agent = credential.as_deref().and_then(Agent::build);
        Session { credential, agent }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    /// Replaces the agent, keeping the credential. Test hook for pointing at
    /// a mock endpoint.
    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agent = Some(agent);
        self
    }

    /// The analysis invoker: refuses outright when no agent is configured,
    /// otherwise delegates to the agent. No outbound call is ever attempted
    /// without a credential.
    pub async fn analyze(&self, prompt: &str, artifact: &ImageArtifact) -> Result<String> {
        match &self.agent {
            Some(agent) => agent.analyze(prompt, artifact).await,
            None => Err(Error::MissingCredential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credential_means_no_agent() {
        let session = Session::from_credential(None);
        assert!(!session.has_credential());
        assert!(session.agent().is_none());
    }

    #[test]
    fn test_empty_credential_means_no_agent() {
        // A present-but-empty variable must not produce a partial agent.
        let session = Session::from_credential(Some(String::new()));
        assert!(session.has_credential());
        assert!(session.agent().is_none());
    }

    #[test]
    fn test_credential_builds_agent_once_per_session() {
        let session = Session::from_credential(Some("test-key".to_string()));
        assert!(session.agent().is_some());

        let rebuilt = Session::from_credential(Some("test-key".to_string()));
        assert_eq!(session.agent(), rebuilt.agent());
    }
}
