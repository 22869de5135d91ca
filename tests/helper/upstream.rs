//! Mock index feed and module proxy on one mockito server

use mockito::{Matcher, Mock, Server, ServerGuard};

pub struct Upstream {
    pub server: ServerGuard,
}

impl Upstream {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn proxy_url(&self) -> String {
        self.server.url()
    }

    pub fn index_url(&self) -> String {
        format!("{}/index", self.server.url())
    }

    /// Serves one feed page. `since` of `None` matches a request without it.
    pub async fn feed_page(&mut self, since: Option<&str>, events: &[(&str, &str, &str)]) -> Mock {
        let query = match since {
            Some(s) => Matcher::UrlEncoded("since".into(), s.into()),
            None => Matcher::Missing,
        };
        let body: String = events
            .iter()
            .map(|(path, version, ts)| {
                format!(
                    "{{\"Path\":\"{}\",\"Version\":\"{}\",\"Timestamp\":\"{}\"}}\n",
                    path, version, ts
                )
            })
            .collect();
        self.server
            .mock("GET", "/index")
            .match_query(query)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    /// Serves `body` with `status` at a proxy path such as `/a.com/m/@v/list`.
    pub async fn serve(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn version_list(&mut self, module: &str, versions: &[&str]) -> Mock {
        self.serve(&format!("/{}/@v/list", module), 200, &versions.join("\n"))
            .await
    }

    pub async fn no_latest(&mut self, module: &str) -> Mock {
        self.serve(&format!("/{}/@latest", module), 404, "not found").await
    }

    pub async fn go_mod(&mut self, module: &str, version: &str, content: &str) -> Mock {
        self.serve(&format!("/{}/@v/{}.mod", module, version), 200, content)
            .await
    }

    pub async fn info(&mut self, module: &str, version: &str, time: &str) -> Mock {
        self.serve(
            &format!("/{}/@v/{}.info", module, version),
            200,
            &format!(r#"{{"Version":"{}","Time":"{}"}}"#, version, time),
        )
        .await
    }
}
