//! Credential resolution for the git-hosting backends.
//!
//! Either draws from a shared pool of repositories and tokens, picking one of
//! each at random per call to spread rate limits, or parses the user's own
//! repository settings.

use rand::prelude::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use picbed_common::{Error, Result, Secret};

use crate::config::GitRepoConfig;
use crate::store::{ClientStore, ClientStoreExt, SHARED_POOL_KEY};

/// Vendor marker embedded in pooled tokens to keep them from being revoked
/// by secret scanners. Stripped before use.
const TOKEN_MARKER: &str = "doocsmd";

/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Git-hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitPlatform {
    GitHub,
    Gitee,
}

impl GitPlatform {
    /// Store identifier, also the host name stem.
    pub fn id(&self) -> &'static str {
        match self {
            GitPlatform::GitHub => "github",
            GitPlatform::Gitee => "gitee",
        }
    }
}

/// A shared pool of repositories and tokens for one platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPool {
    pub username: String,
    pub repo_list: Vec<String>,
    pub branch: String,
    pub access_token_list: Vec<Secret>,
}

/// Shared pools for every git-hosting platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedPools {
    #[serde(default)]
    pub github: GitPool,
    #[serde(default)]
    pub gitee: GitPool,
}

impl SharedPools {
    /// Pool for `platform`.
    pub fn pool(&self, platform: GitPlatform) -> &GitPool {
        match platform {
            GitPlatform::GitHub => &self.github,
            GitPlatform::Gitee => &self.gitee,
        }
    }
}

/// Fully resolved repository target.
#[derive(Debug, Clone)]
pub struct ResolvedRepo {
    pub username: String,
    pub repo: String,
    pub branch: String,
    pub access_token: Secret,
    /// Whether the target came from the shared pool.
    pub shared: bool,
}

/// Resolves git-hosting credentials from the shared pool or the user's config.
pub struct ConfigResolver {
    store: Arc<dyn ClientStore>,
    pools: Arc<SharedPools>,
}

impl ConfigResolver {
    /// Create a resolver.
    pub fn new(store: Arc<dyn ClientStore>, pools: Arc<SharedPools>) -> Self {
        Self { store, pools }
    }

    /// Whether shared-pool mode is enabled in the store.
    pub async fn use_shared_pool(&self) -> Result<bool> {
        Ok(self.store.get(SHARED_POOL_KEY).await?.as_deref() == Some("true"))
    }

    /// Resolve the target for `platform` according to the stored flag.
    pub async fn resolve(&self, platform: GitPlatform) -> Result<ResolvedRepo> {
        if self.use_shared_pool().await? {
            from_pool(platform, self.pools.pool(platform))
        } else {
            let config: GitRepoConfig = self.store.backend_config(platform.id()).await?;
            from_custom(platform, &config)
        }
    }
}

/// Pick one token and one repository from `pool` uniformly at random.
pub fn from_pool(platform: GitPlatform, pool: &GitPool) -> Result<ResolvedRepo> {
    if pool.access_token_list.is_empty() || pool.repo_list.is_empty() {
        return Err(Error::ConfigMissing(format!(
            "Shared {} pool has no repositories or tokens",
            platform.id()
        )));
    }

    let mut rng = rng();
    let token = &pool.access_token_list[rng.random_range(0..pool.access_token_list.len())];
    let repo = &pool.repo_list[rng.random_range(0..pool.repo_list.len())];

    Ok(ResolvedRepo {
        username: pool.username.clone(),
        repo: repo.clone(),
        branch: pool.branch.clone(),
        access_token: Secret::new(token.expose().replacen(TOKEN_MARKER, "", 1)),
        shared: true,
    })
}

/// Parse the user's repository settings.
///
/// Accepts `https://<host>.com/u/r`, `http://<host>.com/u/r`, `<host>.com/u/r`
/// and bare `u/r`.
pub fn from_custom(platform: GitPlatform, config: &GitRepoConfig) -> Result<ResolvedRepo> {
    let host = format!("{}.com/", platform.id());
    let trimmed = config
        .repo
        .replacen(&format!("https://{}", host), "", 1)
        .replacen(&format!("http://{}", host), "", 1)
        .replacen(&host, "", 1);

    let mut parts = trimmed.split('/');
    let username = parts.next().unwrap_or_default().trim();
    let repo = parts.next().unwrap_or_default().trim();
    if username.is_empty() || repo.is_empty() {
        return Err(Error::ConfigMissing(format!(
            "Cannot parse {} repository '{}'",
            platform.id(),
            config.repo
        )));
    }
    if config.access_token.is_empty() {
        return Err(Error::ConfigMissing(format!("{} access token is empty", platform.id())));
    }

    let branch = if config.branch.is_empty() {
        DEFAULT_BRANCH.to_string()
    } else {
        config.branch.clone()
    };

    Ok(ResolvedRepo {
        username: username.to_string(),
        repo: repo.to_string(),
        branch,
        access_token: config.access_token.clone(),
        shared: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn custom(repo: &str, branch: &str) -> GitRepoConfig {
        GitRepoConfig {
            repo: repo.to_string(),
            branch: branch.to_string(),
            access_token: Secret::new("tok"),
        }
    }

    #[test]
    fn test_custom_url_variants() {
        for repo in [
            "https://github.com/alice/pics",
            "http://github.com/alice/pics",
            "github.com/alice/pics",
            "alice/pics",
            "https://github.com/alice/pics/tree/main",
        ] {
            let resolved = from_custom(GitPlatform::GitHub, &custom(repo, "")).unwrap();
            assert_eq!(resolved.username, "alice", "{}", repo);
            assert_eq!(resolved.repo, "pics", "{}", repo);
            assert_eq!(resolved.branch, "main");
            assert!(!resolved.shared);
        }
    }

    #[test]
    fn test_custom_keeps_branch() {
        let resolved = from_custom(GitPlatform::Gitee, &custom("gitee.com/bob/img", "master")).unwrap();
        assert_eq!(resolved.username, "bob");
        assert_eq!(resolved.branch, "master");
    }

    #[test]
    fn test_custom_unparseable_repo() {
        let result = from_custom(GitPlatform::GitHub, &custom("alice", ""));
        assert!(matches!(result, Err(Error::ConfigMissing(_))));
    }

    #[test]
    fn test_pool_strips_marker_and_picks_members() {
        let pool = GitPool {
            username: "shared".to_string(),
            repo_list: vec!["img0".to_string(), "img1".to_string()],
            branch: "main".to_string(),
            access_token_list: vec![Secret::new("ghp_abcdoocsmd123"), Secret::new("ghp_xyzdoocsmd789")],
        };

        for _ in 0..32 {
            let resolved = from_pool(GitPlatform::GitHub, &pool).unwrap();
            assert!(resolved.shared);
            assert!(pool.repo_list.contains(&resolved.repo));
            let token = resolved.access_token.expose();
            assert!(token == "ghp_abc123" || token == "ghp_xyz789", "{}", token);
        }
    }

    #[test]
    fn test_empty_pool_is_config_missing() {
        let result = from_pool(GitPlatform::Gitee, &GitPool::default());
        assert!(matches!(result, Err(Error::ConfigMissing(_))));
    }

    #[tokio::test]
    async fn test_resolver_follows_flag() {
        let store = MemoryStore::with_entries([(
            "githubConfig",
            r#"{"repo":"alice/pics","branch":"","accessToken":"t"}"#,
        )]);
        let pools = SharedPools {
            github: GitPool {
                username: "shared".to_string(),
                repo_list: vec!["img0".to_string()],
                branch: "main".to_string(),
                access_token_list: vec![Secret::new("t")],
            },
            ..Default::default()
        };
        let resolver = ConfigResolver::new(Arc::new(store.clone()), Arc::new(pools));

        let resolved = resolver.resolve(GitPlatform::GitHub).await.unwrap();
        assert_eq!(resolved.username, "alice");

        store.set(SHARED_POOL_KEY, "true").await.unwrap();
        let resolved = resolver.resolve(GitPlatform::GitHub).await.unwrap();
        assert_eq!(resolved.username, "shared");
    }
}
