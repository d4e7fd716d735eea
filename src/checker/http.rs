// src/checker/http.rs
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Serialize)]
pub struct HttpCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ok: bool,
}

/// Try each health path in order. The first path that answers at all (any
/// status) determines the reported URL and status; ok means 2xx/3xx. Only
/// when every path dies at the transport level is the last error reported.
pub async fn probe_http(client: &Client, base_url: &str, paths: &[String]) -> HttpCheck {
    let base = base_url.trim_end_matches('/');
    let mut last_err: Option<String> = None;

    for path in paths {
        let url = format!("{base}{path}");
        match client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                return HttpCheck {
                    url: Some(url),
                    status: Some(status),
                    error: None,
                    ok: (200..400).contains(&status),
                };
            }
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    HttpCheck {
        url: None,
        status: None,
        error: last_err.or_else(|| Some("no health paths configured".to_string())),
        ok: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::builder().timeout(HTTP_TIMEOUT).build().unwrap()
    }

    #[tokio::test]
    async fn first_answering_path_wins() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        let check = probe_http(
            &client(),
            &server.url(),
            &["/health".to_string(), "/".to_string()],
        )
        .await;

        assert!(check.ok);
        assert_eq!(check.status, Some(200));
        assert!(check.url.unwrap().ends_with("/health"));
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported_not_skipped() {
        let mut server = mockito::Server::new_async().await;
        let _bad = server
            .mock("GET", "/health")
            .with_status(500)
            .create_async()
            .await;
        let _good = server.mock("GET", "/").with_status(200).create_async().await;

        // /health answers with 500; the probe must report that, not walk on
        // to the next path.
        let check = probe_http(
            &client(),
            &server.url(),
            &["/health".to_string(), "/".to_string()],
        )
        .await;

        assert!(!check.ok);
        assert_eq!(check.status, Some(500));
    }

    #[tokio::test]
    async fn redirect_class_status_counts_as_ok() {
        let mut server = mockito::Server::new_async().await;
        let _moved = server
            .mock("GET", "/")
            .with_status(301)
            .with_header("Location", "/elsewhere")
            .create_async()
            .await;

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let check = probe_http(&client, &server.url(), &["/".to_string()]).await;

        assert!(check.ok);
        assert_eq!(check.status, Some(301));
    }

    #[tokio::test]
    async fn transport_errors_on_every_path_capture_the_last_error() {
        // Nothing listens here.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = probe_http(
            &client(),
            &format!("http://{addr}"),
            &["/health".to_string(), "/".to_string()],
        )
        .await;

        assert!(!check.ok);
        assert!(check.status.is_none());
        assert!(check.error.is_some());
    }
}
