//! Path/Host routing table: a pure function from `(path, host)` to a logical
//! service name, driven by an ordered, statically-installed rule list.

/// One entry in the routing table.
///
/// `host` is an optional lower-cased substring the request's Host header
/// must contain for this rule to be considered part of the "active" list;
/// `prefix` always ends with `/` and is matched against the request path.
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub host: Option<String>,
    pub prefix: String,
    pub service: String,
}

impl RoutingRule {
    pub fn new(host: Option<&str>, prefix: &str, service: &str) -> Self {
        Self {
            host: host.map(|h| h.to_lowercase()),
            prefix: prefix.to_string(),
            service: service.to_string(),
        }
    }
}

/// The sentinel service name returned when no rule matches.
pub const DEFAULT_SERVICE: &str = "default-service";

/// Ordered routing table. More specific prefixes must precede less specific
/// ones; the first match wins.
pub struct Router {
    rules: Vec<RoutingRule>,
}

impl Router {
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules }
    }

    /// The default installed rule set from the dispatch fabric's spec.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            RoutingRule::new(Some("dushu.com"), "/user-orch/", "user-orch"),
            RoutingRule::new(Some("dushu.com"), "/order-orch/", "order-orch"),
            RoutingRule::new(None, "/springboot-grpc-server/", "springboot-grpc-server"),
            RoutingRule::new(None, "/order/", "order-service"),
            RoutingRule::new(None, "/product/", "product-service"),
            RoutingRule::new(None, "/payment/", "payment-service"),
        ])
    }

    /// Resolves `path` (and optionally `host`) to a logical service name.
    ///
    /// Rules scoped to a host that matches `host` (case-insensitively, by
    /// substring) are considered before host-agnostic rules; within each
    /// group, rule order decides ties.
    pub fn resolve(&self, path: &str, host: Option<&str>) -> String {
        let host_lower = host.map(|h| h.to_lowercase());

        let host_scoped = self.rules.iter().filter(|r| {
            r.host.as_deref().is_some_and(|h| {
                host_lower.as_deref().is_some_and(|incoming| incoming.contains(h))
            })
        });
        for rule in host_scoped {
            if path.starts_with(&rule.prefix) {
                return rule.service.clone();
            }
        }

        let host_agnostic = self.rules.iter().filter(|r| r.host.is_none());
        for rule in host_agnostic {
            if path.starts_with(&rule.prefix) {
                return rule.service.clone();
            }
        }

        DEFAULT_SERVICE.to_string()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_host_scoped_prefix() {
        let router = Router::with_defaults();
        assert_eq!(router.resolve("/user-orch/profile", Some("dushu.com")), "user-orch");
    }

    #[test]
    fn host_scoped_rule_does_not_leak_to_other_hosts() {
        let router = Router::with_defaults();
        assert_eq!(
            router.resolve("/user-orch/profile", Some("other.example")),
            DEFAULT_SERVICE
        );
    }

    #[test]
    fn resolves_host_agnostic_prefix_regardless_of_host() {
        let router = Router::with_defaults();
        assert_eq!(router.resolve("/product/42", Some("anything.com")), "product-service");
        assert_eq!(router.resolve("/product/42", None), "product-service");
    }

    #[test]
    fn falls_back_to_default_service() {
        let router = Router::with_defaults();
        assert_eq!(router.resolve("/unknown/path", None), DEFAULT_SERVICE);
    }

    #[test]
    fn more_specific_prefix_wins_when_listed_first() {
        let rules = vec![
            RoutingRule::new(None, "/a/b/", "specific"),
            RoutingRule::new(None, "/a/", "general"),
        ];
        let router = Router::new(rules);
        assert_eq!(router.resolve("/a/b/c", None), "specific");
        assert_eq!(router.resolve("/a/x", None), "general");
    }
}
