use std::path::PathBuf;

use tandem_config::Launcher;

use crate::types::{Endpoint, ServiceSpec};

pub const LOCALHOST: &str = "127.0.0.1";
pub const BACKEND_PORT: u16 = 8000;
pub const FRONTEND_PORT: u16 = 8501;
pub const BACKEND_ENTRY: &str = "app.py";
pub const FRONTEND_ENTRY: &str = "frontend.py";
pub const DOCS_PATH: &str = "/docs";

/// `uvicorn app:app` on 127.0.0.1:8000 with live reload.
#[must_use]
pub fn backend(launcher: &Launcher) -> ServiceSpec {
    let port = BACKEND_PORT.to_string();
    ServiceSpec::new(
        "backend",
        [
            launcher.python.as_str(),
            "-m",
            "uvicorn",
            "app:app",
            "--host",
            LOCALHOST,
            "--port",
            port.as_str(),
            "--reload",
        ]
        .map(str::to_owned)
        .to_vec(),
        BACKEND_ENTRY,
        launcher.workdir.clone(),
        Endpoint::new(LOCALHOST, BACKEND_PORT),
    )
}

/// `streamlit run frontend.py` on 127.0.0.1:8501.
#[must_use]
pub fn frontend(launcher: &Launcher) -> ServiceSpec {
    let port = FRONTEND_PORT.to_string();
    ServiceSpec::new(
        "frontend",
        [
            launcher.python.as_str(),
            "-m",
            "streamlit",
            "run",
            FRONTEND_ENTRY,
            "--server.port",
            port.as_str(),
            "--server.address",
            LOCALHOST,
        ]
        .map(str::to_owned)
        .to_vec(),
        FRONTEND_ENTRY,
        launcher.workdir.clone(),
        Endpoint::new(LOCALHOST, FRONTEND_PORT),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// The two services started by one run, backend first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub backend: ServiceSpec,
    pub frontend: ServiceSpec,
}

impl LaunchPlan {
    #[must_use]
    pub fn from_launcher(launcher: &Launcher) -> Self {
        Self {
            backend: backend(launcher),
            frontend: frontend(launcher),
        }
    }

    /// First required file that does not exist, backend checked first.
    #[must_use]
    pub fn missing_file(&self) -> Option<PathBuf> {
        [&self.backend, &self.frontend]
            .into_iter()
            .map(ServiceSpec::required_path)
            .find(|path| !path.exists())
    }

    #[must_use]
    pub fn endpoints(&self) -> Vec<Link> {
        vec![
            Link {
                label: "Backend API".to_owned(),
                url: self.backend.endpoint().url(),
            },
            Link {
                label: "Frontend UI".to_owned(),
                url: self.frontend.endpoint().url(),
            },
            Link {
                label: "API documentation".to_owned(),
                url: self.backend.endpoint().url_with_path(DOCS_PATH),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_command_lines() {
        let launcher = Launcher {
            python: "python3.11".to_owned(),
            ..Launcher::default()
        };
        let plan = LaunchPlan::from_launcher(&launcher);

        assert_eq!(
            plan.backend.command_line(),
            "python3.11 -m uvicorn app:app --host 127.0.0.1 --port 8000 --reload"
        );
        assert_eq!(
            plan.frontend.command_line(),
            "python3.11 -m streamlit run frontend.py --server.port 8501 --server.address 127.0.0.1"
        );
    }

    #[test]
    fn test_endpoints() {
        let plan = LaunchPlan::from_launcher(&Launcher::default());
        let urls: Vec<_> = plan.endpoints().into_iter().map(|link| link.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:8000",
                "http://127.0.0.1:8501",
                "http://127.0.0.1:8000/docs",
            ]
        );
    }

    #[test]
    fn test_missing_file_prefers_backend() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher {
            workdir: dir.path().to_path_buf(),
            ..Launcher::default()
        };
        let plan = LaunchPlan::from_launcher(&launcher);
        assert_eq!(plan.missing_file(), Some(dir.path().join(BACKEND_ENTRY)));

        std::fs::write(dir.path().join(BACKEND_ENTRY), "").unwrap();
        assert_eq!(plan.missing_file(), Some(dir.path().join(FRONTEND_ENTRY)));

        std::fs::write(dir.path().join(FRONTEND_ENTRY), "").unwrap();
        assert_eq!(plan.missing_file(), None);
    }
}
