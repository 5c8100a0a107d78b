use super::validate::validate_compose_path;
use super::{ActionOutcome, HostOps};
use crate::command::HostCommand;
use crate::error::Result;
use crate::registry::{ComposeRegistry, DEFAULT_UP_ARGS, parse_up_args};
use std::path::Path;
use tracing::{info, warn};

/// `docker-compose -f <file>` run from the file's directory.
fn compose_command(path: &str) -> HostCommand {
    let file = Path::new(path);
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let command = HostCommand::new("docker-compose").arg("-f").arg(file_name);
    match file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => command.current_dir(dir),
        None => command,
    }
}

impl HostOps {
    /// Bring a compose project up with the arguments registered for this
    /// path, or the defaults when the path is not registered.
    pub async fn compose_up(&self, registry: &ComposeRegistry, path: &str) -> Result<ActionOutcome> {
        let path = validate_compose_path(path)?;
        let up_argv = match registry.find_by_path(path).await {
            Some(app) => app.up_argv()?,
            None => {
                warn!("Compose up for unregistered path {}, using default arguments", path);
                parse_up_args(DEFAULT_UP_ARGS)?
            }
        };

        info!("🚀 docker-compose {} ({})", up_argv.join(" "), path);
        let command = compose_command(path)
            .args(up_argv)
            .timeout(self.compose_timeout);
        let result = self.run(command).await?;
        Ok(ActionOutcome::completed(
            "Docker Compose up executed successfully",
            result,
        ))
    }

    pub async fn compose_down(&self, path: &str) -> Result<ActionOutcome> {
        let path = validate_compose_path(path)?;
        info!("🛑 docker-compose down ({})", path);
        let command = compose_command(path)
            .arg("down")
            .timeout(self.compose_timeout);
        let result = self.run(command).await?;
        Ok(ActionOutcome::completed(
            "Docker Compose down executed successfully",
            result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::client::MockCommandRunner;
    use crate::error::{TailbrainError, ValidationError};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    async fn registry(dir: &tempfile::TempDir) -> ComposeRegistry {
        ComposeRegistry::open(dir.path().join("compose-apps.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_compose_up_uses_registered_args() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry(&dir).await;
        registry
            .add("web", "/srv/web/docker-compose.yml", Some("up -d --build"))
            .await
            .unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_run_host_command()
            .withf(|command: &HostCommand| {
                command.argv()
                    == vec!["docker-compose", "-f", "docker-compose.yml", "up", "-d", "--build"]
                    && command.cwd == Some(PathBuf::from("/srv/web"))
                    && command.timeout == Some(Duration::from_secs(120))
            })
            .times(1)
            .returning(|_| Ok(ok("")));

        let ops = HostOps::new(Arc::new(runner)).with_compose_timeout(Duration::from_secs(120));
        let outcome = ops
            .compose_up(&registry, "/srv/web/docker-compose.yml")
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_compose_up_unregistered_path_uses_default_args() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry(&dir).await;
        let runner = expect_argv(
            &["docker-compose", "-f", "compose.yaml", "up", "-d", "--pull=always"],
            ok(""),
        );
        HostOps::new(Arc::new(runner))
            .compose_up(&registry, "/opt/app/compose.yaml")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_compose_down() {
        let runner = expect_argv(&["docker-compose", "-f", "docker-compose.yml", "down"], ok(""));
        let outcome = HostOps::new(Arc::new(runner))
            .compose_down("/srv/web/docker-compose.yml")
            .await
            .unwrap();
        assert_eq!(outcome.message, "Docker Compose down executed successfully");
    }

    #[tokio::test]
    async fn test_compose_rejects_non_yaml_path() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run_host_command().never();
        let err = HostOps::new(Arc::new(runner))
            .compose_down("/srv/web/run.sh")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TailbrainError::Validation(ValidationError::InvalidComposePath { .. })
        ));
    }
}
