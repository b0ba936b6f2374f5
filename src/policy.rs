use std::collections::HashSet;

pub const BUNDLE_PREFIX: &str = "bundle:";

const SECRETS_MANAGER_READ_WRITE: &str = "arn:aws:iam::aws:policy/SecretsManagerReadWrite";
const SQS_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonSQSFullAccess";
const S3_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonS3FullAccess";
const SES_FULL_ACCESS: &str = "arn:aws:iam::aws:policy/AmazonSESFullAccess";
const SSM_MANAGED_INSTANCE_CORE: &str = "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore";
const CLOUDWATCH_AGENT_SERVER: &str = "arn:aws:iam::aws:policy/CloudWatchAgentServerPolicy";
const LAMBDA_BASIC_EXECUTION: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

pub type Bundle = (&'static str, &'static [&'static str]);

pub const BUILTIN_BUNDLES: &[Bundle] = &[
    ("bundle:laravel-min", &[SECRETS_MANAGER_READ_WRITE]),
    (
        "bundle:laravel-full",
        &[
            SECRETS_MANAGER_READ_WRITE,
            SQS_FULL_ACCESS,
            S3_FULL_ACCESS,
            SSM_MANAGED_INSTANCE_CORE,
            CLOUDWATCH_AGENT_SERVER,
        ],
    ),
    ("bundle:laravel-s3-sqs", &[S3_FULL_ACCESS, SQS_FULL_ACCESS]),
    ("bundle:go-min", &[SECRETS_MANAGER_READ_WRITE]),
    ("bundle:nextjs-min", &[SECRETS_MANAGER_READ_WRITE]),
    (
        "bundle:laravel-worker-email",
        &[
            SQS_FULL_ACCESS,
            SECRETS_MANAGER_READ_WRITE,
            SES_FULL_ACCESS,
            SSM_MANAGED_INSTANCE_CORE,
            CLOUDWATCH_AGENT_SERVER,
        ],
    ),
    (
        "bundle:laravel-worker-heavy",
        &[
            SQS_FULL_ACCESS,
            SECRETS_MANAGER_READ_WRITE,
            SSM_MANAGED_INSTANCE_CORE,
            CLOUDWATCH_AGENT_SERVER,
        ],
    ),
    (
        "bundle:lambda-s3-full",
        &[S3_FULL_ACCESS, LAMBDA_BASIC_EXECUTION],
    ),
];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Bundle {bundle} references another bundle: {member}")]
    NestedBundle { bundle: String, member: String },
}

/// Lookup table from bundle names to the policy ARNs they stand for.
#[derive(Debug, Clone, Copy)]
pub struct PolicyBundles {
    bundles: &'static [Bundle],
}

impl Default for PolicyBundles {
    fn default() -> Self {
        return Self::new(BUILTIN_BUNDLES);
    }
}

impl PolicyBundles {
    pub const fn new(bundles: &'static [Bundle]) -> Self {
        return Self { bundles };
    }

    pub fn members(&self, bundle: &str) -> Option<&'static [&'static str]> {
        return self
            .bundles
            .iter()
            .find(|(name, _)| *name == bundle)
            .map(|(_, members)| *members);
    }

    /// Expands bundle references into their members, keeping first-seen order
    /// and dropping duplicates.
    pub fn resolve(&self, policies: &[String]) -> Result<Vec<String>, Error> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut resolved = Vec::new();

        for token in policies {
            if !token.starts_with(BUNDLE_PREFIX) {
                push_unique(token, &mut seen, &mut resolved);
                continue;
            }

            let members = match self.members(token) {
                Some(members) => members,
                None => {
                    tracing::warn!(bundle = %token, "Unknown policy bundle, expanding to nothing");
                    continue;
                }
            };

            for member in members {
                if member.starts_with(BUNDLE_PREFIX) {
                    return Err(Error::NestedBundle {
                        bundle: token.clone(),
                        member: member.to_string(),
                    });
                }
                push_unique(member, &mut seen, &mut resolved);
            }
        }

        return Ok(resolved);
    }
}

fn push_unique(policy: &str, seen: &mut HashSet<String>, resolved: &mut Vec<String>) {
    if seen.insert(policy.to_string()) {
        resolved.push(policy.to_string());
    }
}

pub fn resolve_policies(policies: &[String]) -> Result<Vec<String>, Error> {
    return PolicyBundles::default().resolve(policies);
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::resolve_policies;
    use super::Error;
    use super::PolicyBundles;
    use super::BUILTIN_BUNDLES;
    use super::SECRETS_MANAGER_READ_WRITE;

    fn tokens(values: &[&str]) -> Vec<String> {
        return values.iter().map(|value| value.to_string()).collect();
    }

    #[test]
    fn literal_policies_pass_through() {
        let policies = tokens(&["arn:aws:iam::123:policy/custom"]);
        assert_eq!(Ok(policies.clone()), resolve_policies(&policies));
    }

    #[test]
    fn bundle_expands_to_members() {
        let resolved = resolve_policies(&tokens(&["bundle:laravel-min"])).unwrap();
        assert_eq!(vec![SECRETS_MANAGER_READ_WRITE.to_string()], resolved);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let resolved = resolve_policies(&tokens(&[
            "arn:aws:iam::123:policy/custom",
            "bundle:laravel-s3-sqs",
            "bundle:laravel-full",
        ]))
        .unwrap();

        assert_eq!(
            tokens(&[
                "arn:aws:iam::123:policy/custom",
                "arn:aws:iam::aws:policy/AmazonS3FullAccess",
                "arn:aws:iam::aws:policy/AmazonSQSFullAccess",
                "arn:aws:iam::aws:policy/SecretsManagerReadWrite",
                "arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore",
                "arn:aws:iam::aws:policy/CloudWatchAgentServerPolicy",
            ]),
            resolved
        );
    }

    #[test]
    fn unknown_bundle_expands_to_nothing() {
        let resolved = resolve_policies(&tokens(&["bundle:does-not-exist"])).unwrap();
        assert_eq!(true, resolved.is_empty());
    }

    #[test]
    fn expansion_is_idempotent() {
        let once = resolve_policies(&tokens(&["bundle:laravel-worker-email", "bundle:go-min"])).unwrap();
        let twice = resolve_policies(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_bundle_fails() {
        static NESTED: &[super::Bundle] = &[
            ("bundle:outer", &["bundle:inner"]),
            ("bundle:inner", &["arn:aws:iam::aws:policy/Inner"]),
        ];

        let result = PolicyBundles::new(NESTED).resolve(&tokens(&["bundle:outer"]));
        match result.err().unwrap() {
            Error::NestedBundle { bundle, member } => {
                assert_eq!("bundle:outer", bundle);
                assert_eq!("bundle:inner", member);
            }
        }
    }

    proptest! {
        #[test]
        fn overlapping_bundles_yield_members_once(
            picks in prop::collection::vec(0..BUILTIN_BUNDLES.len(), 1..6),
        ) {
            let policies: Vec<String> = picks
                .iter()
                .map(|index| BUILTIN_BUNDLES[*index].0.to_string())
                .collect();

            let resolved = resolve_policies(&policies).unwrap();
            for member in &resolved {
                prop_assert_eq!(1, resolved.iter().filter(|other| *other == member).count());
            }

            for index in &picks {
                for member in BUILTIN_BUNDLES[*index].1 {
                    prop_assert!(resolved.iter().any(|policy| policy == member));
                }
            }
        }
    }
}
