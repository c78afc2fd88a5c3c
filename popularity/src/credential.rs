/// Environment variables consulted for the API credential, in order.
const CREDENTIAL_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Read the popularity API credential from the process environment.
///
/// Empty values are treated as unset.
pub fn credential_from_env() -> Option<String> {
    credential_from(|key| std::env::var(key).ok())
}

fn credential_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    CREDENTIAL_ENV_VARS.iter().find_map(|key| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
