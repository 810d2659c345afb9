use haggle_channels::ChannelDomain;

/// One wiring row: which services a domain gets and which public channels
/// it starts with.
#[derive(Debug, Clone, Copy)]
pub struct DomainSpec {
    pub domain: ChannelDomain,
    /// A privileged domain gets the specialized trade services instead of
    /// a common public service, and no eager seeds.
    pub privileged: bool,
    /// Eagerly created public channels, in the order users see them.
    pub seed_topics: &'static [&'static str],
}

/// The supported domains. Adding a domain is one row here plus a
/// `ChannelDomain` variant.
pub const DOMAIN_SPECS: &[DomainSpec] = &[
    DomainSpec {
        domain: ChannelDomain::Trade,
        privileged: true,
        seed_topics: &[],
    },
    DomainSpec {
        domain: ChannelDomain::Discussion,
        privileged: false,
        seed_topics: &["bisq", "bitcoin", "markets", "economy", "offTopic"],
    },
    DomainSpec {
        domain: ChannelDomain::Events,
        privileged: false,
        seed_topics: &[
            "conferences",
            "meetups",
            "podcasts",
            "noKyc",
            "nodes",
            "tradeEvents",
        ],
    },
    DomainSpec {
        domain: ChannelDomain::Support,
        privileged: false,
        seed_topics: &["support", "questions", "reports"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_domain_has_exactly_one_row() {
        for domain in ChannelDomain::ALL {
            let rows = DOMAIN_SPECS.iter().filter(|s| s.domain == domain).count();
            assert_eq!(rows, 1, "domain {domain} must appear exactly once");
        }
        assert_eq!(DOMAIN_SPECS.len(), ChannelDomain::ALL.len());
    }

    #[test]
    fn test_only_the_privileged_domain_is_unseeded() {
        for spec in DOMAIN_SPECS {
            if spec.privileged {
                assert!(spec.seed_topics.is_empty());
            } else {
                assert!(!spec.seed_topics.is_empty());
            }
        }
    }
}
