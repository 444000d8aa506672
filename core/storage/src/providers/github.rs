//! GitHub contents-API upload.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Serialize;
use tracing::{info, warn};

use picbed_common::{Error, Result, UploadRequest};

use crate::context::UploadContext;
use crate::filename::{date_filename, FilenameKey};
use crate::http;
use crate::provider::UploadProvider;
use crate::resolver::{GitPlatform, ResolvedRepo};
use crate::store::{config_key, ClientStoreExt};

use super::git::{download_url, upload_message};

#[derive(Serialize)]
struct PutContent<'a> {
    content: &'a str,
    branch: &'a str,
    message: &'a str,
}

/// The other of `main`/`master`.
pub fn alternate_branch(branch: &str) -> &'static str {
    if branch == "master" {
        "main"
    } else {
        "master"
    }
}

/// Uploads through `PUT /repos/{owner}/{repo}/contents/{path}`.
///
/// A "branch not found" rejection is retried exactly once on the alternate
/// of `main`/`master`. When that succeeds with the user's own repository the
/// corrected branch is written back to the stored configuration; shared-pool
/// targets are never written back.
pub struct GitHubProvider {
    ctx: UploadContext,
}

impl GitHubProvider {
    /// Create the provider.
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    async fn put(&self, target: &ResolvedRepo, branch: &str, path: &str, content: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.ctx.endpoints.github_api, target.username, target.repo, path
        );
        let message = upload_message(&self.ctx.origin);

        let response = self
            .ctx
            .http
            .put(&url)
            .header(header::AUTHORIZATION, format!("token {}", target.access_token.expose()))
            .json(&PutContent {
                content,
                branch,
                message: &message,
            })
            .send()
            .await
            .map_err(|e| http::network("GitHub upload failed", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            let message = http::error_message(&body);
            if message.contains("Branch") {
                return Err(Error::BranchNotFound {
                    branch: branch.to_string(),
                    message,
                });
            }
            return Err(Error::status(status.as_u16(), message));
        }

        let body: serde_json::Value = http::handle_json(response).await?;
        download_url(&body)
    }

    /// Write the corrected branch into the stored custom configuration,
    /// keeping every other field as stored.
    async fn persist_branch(&self, branch: &str) -> Result<()> {
        let key = config_key(GitPlatform::GitHub.id());
        let mut config: serde_json::Value = self
            .ctx
            .store
            .get_json(&key)
            .await?
            .unwrap_or_else(|| serde_json::json!({}));
        if let Some(fields) = config.as_object_mut() {
            fields.insert("branch".to_string(), serde_json::json!(branch));
        }
        self.ctx.store.set_json(&key, &config).await
    }
}

#[async_trait]
impl UploadProvider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    async fn upload(&self, request: &UploadRequest) -> Result<String> {
        let target = self.ctx.resolver().resolve(GitPlatform::GitHub).await?;
        let path = FilenameKey::dated(
            self.ctx.clock.now(),
            date_filename(self.ctx.clock.as_ref(), &request.file.name),
        )
        .to_key();

        let (branch, url) = match self.put(&target, &target.branch, &path, &request.content).await {
            Ok(url) => (target.branch.clone(), url),
            Err(Error::BranchNotFound { branch, .. }) => {
                let alt = alternate_branch(&branch);
                warn!("Branch {} not found, trying {}", branch, alt);

                let url = self.put(&target, alt, &path, &request.content).await?;
                if !target.shared {
                    self.persist_branch(alt).await?;
                    info!("Stored {} as the GitHub branch", alt);
                }
                (alt.to_string(), url)
            }
            Err(e) => return Err(e),
        };

        if target.shared {
            let raw = format!("raw.githubusercontent.com/{}/{}/{}/", target.username, target.repo, branch);
            let cdn = format!("fastly.jsdelivr.net/gh/{}/{}@{}/", target.username, target.repo, branch);
            Ok(url.replace(&raw, &cdn))
        } else {
            Ok(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ClientStore, MemoryStore, SHARED_POOL_KEY};
    use crate::testing::{context, endpoints_for, png_request};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENTS_PATH: &str = r"^/repos/alice/pics/contents/2023/11/14/\d{13}-[0-9a-f-]{36}\.png$";

    fn download(branch: &str) -> serde_json::Value {
        json!({
            "content": {
                "download_url": format!("https://raw.githubusercontent.com/alice/pics/{}/2023/11/14/x.png", branch)
            }
        })
    }

    fn custom_store(branch: &str) -> MemoryStore {
        MemoryStore::with_entries([(
            "githubConfig",
            json!({"repo": "https://github.com/alice/pics", "branch": branch, "accessToken": "tok"}).to_string(),
        )])
    }

    fn branch_missing(branch: &str) -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({ "message": format!("Branch {} not found", branch) }))
    }

    #[tokio::test]
    async fn test_upload_custom_repo() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(CONTENTS_PATH))
            .and(header("Authorization", "token tok"))
            .and(body_partial_json(json!({"branch": "main", "content": "aGVsbG8=", "message": "Upload by https://md.example"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(download("main")))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(custom_store(""), endpoints_for(&server)).with_origin("https://md.example");
        let url = GitHubProvider::new(ctx).upload(&png_request(10)).await.unwrap();
        assert_eq!(url, "https://raw.githubusercontent.com/alice/pics/main/2023/11/14/x.png");
    }

    #[tokio::test]
    async fn test_branch_fallback_persists_corrected_branch() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({"branch": "main"})))
            .respond_with(branch_missing("main"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({"branch": "master"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(download("master")))
            .expect(1)
            .mount(&server)
            .await;

        let store = custom_store("main");
        let ctx = context(store.clone(), endpoints_for(&server));
        let url = GitHubProvider::new(ctx).upload(&png_request(10)).await.unwrap();
        assert!(url.contains("/master/"));

        let stored: serde_json::Value = store.get_json("githubConfig").await.unwrap().unwrap();
        assert_eq!(stored["branch"], "master");
        assert_eq!(stored["repo"], "https://github.com/alice/pics");
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({"branch": "master"})))
            .respond_with(branch_missing("master"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({"branch": "main"})))
            .respond_with(branch_missing("main"))
            .expect(1)
            .mount(&server)
            .await;

        let store = custom_store("master");
        let ctx = context(store.clone(), endpoints_for(&server));
        let err = GitHubProvider::new(ctx).upload(&png_request(10)).await.unwrap_err();
        match err {
            Error::BranchNotFound { branch, .. } => assert_eq!(branch, "main"),
            other => panic!("unexpected error: {}", other),
        }

        let stored: serde_json::Value = store.get_json("githubConfig").await.unwrap().unwrap();
        assert_eq!(stored["branch"], "master");
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        for response in [
            ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
            ResponseTemplate::new(422).set_body_json(json!({"message": "Branch protection"})),
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("PUT"))
                .respond_with(response)
                .expect(1)
                .mount(&server)
                .await;

            let ctx = context(custom_store("main"), endpoints_for(&server));
            let err = GitHubProvider::new(ctx).upload(&png_request(10)).await.unwrap_err();
            assert!(!matches!(err, Error::BranchNotFound { .. }), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_shared_pool_uses_cdn_and_skips_persist() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/repos/shared/img0/contents/"))
            .and(header("Authorization", "token ghp_abc"))
            .and(body_partial_json(json!({"branch": "main"})))
            .respond_with(branch_missing("main"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(body_partial_json(json!({"branch": "master"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": {"download_url": "https://raw.githubusercontent.com/shared/img0/master/2023/11/14/x.png"}
            })))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        store.set(SHARED_POOL_KEY, "true").await.unwrap();
        let pools: crate::resolver::SharedPools = serde_json::from_value(json!({
            "github": {"username": "shared", "repoList": ["img0"], "branch": "main", "accessTokenList": ["ghp_doocsmdabc"]}
        }))
        .unwrap();
        let ctx = context(store.clone(), endpoints_for(&server)).with_pools(pools);

        let url = GitHubProvider::new(ctx).upload(&png_request(10)).await.unwrap();
        assert_eq!(url, "https://fastly.jsdelivr.net/gh/shared/img0@master/2023/11/14/x.png");
        assert!(store.get("githubConfig").await.unwrap().is_none());
    }

    #[test]
    fn test_alternate_branch() {
        assert_eq!(alternate_branch("main"), "master");
        assert_eq!(alternate_branch("master"), "main");
        assert_eq!(alternate_branch("dev"), "master");
    }
}
