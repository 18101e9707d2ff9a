/// Supplies the internal registry hostname pull specs are rooted at.
///
/// Queried once per engine call; the value may change between calls.
pub trait RegistryHostnameSource: Send + Sync {
    fn internal_hostname(&self) -> Option<String>;
}

/// A hostname fixed at construction.
#[derive(Clone, Debug, Default)]
pub struct StaticHostname(Option<String>);

impl StaticHostname {
    pub fn new(hostname: Option<String>) -> Self {
        Self(hostname.filter(|h| !h.is_empty()))
    }
}

impl RegistryHostnameSource for StaticHostname {
    fn internal_hostname(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hostname_is_none() {
        assert_eq!(StaticHostname::new(Some(String::new())).internal_hostname(), None);
        assert_eq!(
            StaticHostname::new(Some("registry:5000".into())).internal_hostname().as_deref(),
            Some("registry:5000")
        );
    }
}
