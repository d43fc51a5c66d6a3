use gpu::RenderError;
use runtime::{InvalidProfile, SchedulerError};
use scene::RegionError;

#[derive(Debug, Clone, PartialEq)]
pub enum HeroError {
    /// The canvas or the rendering capability is not available.
    MissingDependency(String),
    Initialization(String),
    Render(RenderError),
    InvalidConfig(String),
}

impl std::fmt::Display for HeroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeroError::MissingDependency(what) => write!(f, "missing dependency: {what}"),
            HeroError::Initialization(msg) => write!(f, "hero initialization failed: {msg}"),
            HeroError::Render(err) => write!(f, "{err}"),
            HeroError::InvalidConfig(msg) => write!(f, "invalid hero configuration: {msg}"),
        }
    }
}

impl std::error::Error for HeroError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeroError::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RenderError> for HeroError {
    fn from(err: RenderError) -> Self {
        HeroError::Render(err)
    }
}

impl From<InvalidProfile> for HeroError {
    fn from(err: InvalidProfile) -> Self {
        HeroError::InvalidConfig(err.to_string())
    }
}

impl From<RegionError> for HeroError {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::InvalidStep(_) => HeroError::InvalidConfig(err.to_string()),
            other => HeroError::Initialization(other.to_string()),
        }
    }
}

impl From<SchedulerError> for HeroError {
    fn from(err: SchedulerError) -> Self {
        HeroError::MissingDependency(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = HeroError::MissingDependency("canvas #hero-globe".into());
        assert_eq!(err.to_string(), "missing dependency: canvas #hero-globe");

        let err: HeroError = RegionError::InvalidStep(0.0).into();
        assert!(matches!(err, HeroError::InvalidConfig(_)));

        let err: HeroError = RenderError::SurfaceLost("outdated".into()).into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
