use browser_intent::testing::{MockResponse, MockTransport};
use browser_intent::{BrowserConfig, BrowserError, BrowserSession, Method};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

const ORIGIN: &str = "http://shop.test";

fn quick() -> BrowserConfig {
    BrowserConfig::default().with_minimum_timeout(Duration::ZERO)
}

async fn open(transport: &MockTransport, path: &str) -> BrowserSession<MockTransport> {
    let url = format!("{}{}", ORIGIN, path);
    assert_ok!(BrowserSession::new(transport.clone(), quick(), &url).await)
}

const ORDER_PAGE: &str = r#"
<html><body>
  <form method="post" action="/post">
    <p><label>Customer name: <input name="custname"></label></p>
    <fieldset>
      <label><input type="checkbox" name="topping" value="bacon"> Bacon </label>
    </fieldset>
    <p><label>Comments: <textarea name="comments"></textarea></label></p>
    <p><button>Submit order</button></p>
  </form>
</body></html>
"#;

const LOGIN_PAGE: &str = r#"
<html><body>
  <form method="post" action="/bad">
    <input name="user"><input type="password" name="pw">
  </form>
  <form method="post" action="/good">
    <input name="user"><input type="password" name="pw">
  </form>
</body></html>
"#;

#[tokio::test]
async fn first_request_carries_initial_referrer_and_user_agent() {
    let transport = MockTransport::new().echo("/");
    let session = open(&transport, "/").await;

    let first = &transport.requests()[0];
    assert_eq!(first.referrer.as_deref(), Some("https://www.google.com"));
    assert!(session.page_content().contains("user-agent:browser-intent/"));
    assert_eq!(session.referrer(), Some("http://shop.test/"));
    assert_eq!(session.status(), 200);
}

#[tokio::test]
async fn id_beats_name_beats_text() {
    let transport = MockTransport::new()
        .page(
            "/",
            r#"<a href="/by-text">go</a>
               <a name="go" href="/by-name">second</a>
               <a id="go" href="/by-id">third</a>"#,
        )
        .page("/by-id", "<p>id</p>")
        .page("/by-name", "<p>name</p>")
        .page("/by-text", "<p>text</p>");
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.click("go", false).await));
    assert_eq!(session.url().path(), "/by-id");

    assert_ok!(session.navigate("/").await);
    assert!(assert_ok!(session.click("second", false).await));
    assert_eq!(session.url().path(), "/by-name");
}

#[tokio::test]
async fn selector_is_the_last_resort() {
    let transport = MockTransport::new()
        .page("/", r#"<nav><a class="next" href="/page/2">»</a></nav>"#)
        .page("/page/2", "<p>two</p>");
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.click("nav a.next", false).await));
    assert_eq!(session.url().path(), "/page/2");
}

#[tokio::test]
async fn unknown_target_is_not_an_error() {
    let transport = MockTransport::new().page("/", "<p>nothing to click</p>");
    let mut session = open(&transport, "/").await;

    assert!(!assert_ok!(session.click("Checkout", false).await));
    assert!(!assert_ok!(session.click_link("Checkout", false).await));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn exact_click_ignores_partial_text() {
    let transport = MockTransport::new()
        .page(
            "/",
            r#"<a href="/more">More news</a><a href="/news">News</a>"#,
        )
        .page("/more", "")
        .page("/news", "");
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.click_link("news", false).await));
    assert_eq!(session.url().path(), "/more");

    assert_ok!(session.navigate("/").await);
    assert!(assert_ok!(session.click_link("News", true).await));
    assert_eq!(session.url().path(), "/news");
}

#[tokio::test]
async fn clicking_a_checkbox_twice_restores_it() {
    let transport = MockTransport::new().page("/", ORDER_PAGE).echo("/post");
    let mut session = open(&transport, "/").await;
    let bacon = session.document().by_attr_value("name", "topping").unwrap();

    assert!(assert_ok!(session.click("topping", false).await));
    assert!(session.document().has_attr(bacon, "checked"));
    assert!(assert_ok!(session.click("topping", false).await));
    assert!(!session.document().has_attr(bacon, "checked"));
    assert_eq!(transport.requests().len(), 1);

    assert!(assert_ok!(session.click("Submit order", false).await));
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.form_value("topping"), None);
}

#[tokio::test]
async fn submit_order_posts_the_form() {
    let transport = MockTransport::new().page("/forms/post", ORDER_PAGE).echo("/post");
    let mut session = open(&transport, "/forms/post").await;

    assert!(assert_ok!(session.click("topping", false).await));
    assert!(assert_ok!(session.click("Submit order", false).await));

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.url.as_str(), "http://shop.test/post");
    assert_eq!(sent.form_value("topping"), Some("bacon"));
    assert_eq!(sent.form_value("custname"), Some(""));
    assert_eq!(sent.referrer.as_deref(), Some("http://shop.test/forms/post"));
    assert!(session.page_content().contains("topping=bacon"));
}

#[tokio::test]
async fn execute_form_fills_and_submits() {
    let transport = MockTransport::new()
        .page(
            "/",
            r#"<form action="/search"><input name="q"><input type="submit" value="Go"></form>"#,
        )
        .echo("/search");
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.execute_form(&[("q", "v")]).await));
    assert_eq!(session.url().as_str(), "http://shop.test/search?q=v");
    assert!(session.contains("q=v"));
    assert!(session.contains("#echo"));
}

#[tokio::test]
async fn execute_form_fills_order_form_fields() {
    let transport = MockTransport::new().page("/", ORDER_PAGE).echo("/post");
    let mut session = open(&transport, "/").await;

    let bindings = [("custname", "Ada"), ("comments", "ring twice")];
    assert!(assert_ok!(session.execute_form(&bindings).await));

    let sent = transport.last_request().unwrap();
    assert_eq!(sent.form_value("custname"), Some("Ada"));
    assert_eq!(sent.form_value("comments"), Some("ring twice"));
}

#[tokio::test]
async fn ambiguous_form_is_skipped() {
    let transport = MockTransport::new()
        .page(
            "/",
            r#"<form method="post" action="/first"><input name="q"><input name="q"></form>
               <form method="post" action="/second"><input name="q"></form>"#,
        )
        .echo("/first")
        .echo("/second");
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.execute_form(&[("q", "v")]).await));
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.url.path(), "/second");
    assert_eq!(sent.form_value("q"), Some("v"));
}

#[tokio::test]
async fn text_inside_a_widget_child_does_not_name_the_widget() {
    let transport = MockTransport::new().page(
        "/",
        r#"<form action="/x">
             <div role="combobox"><span>Country</span></div>
             <input name="other">
           </form>"#,
    );
    let mut session = open(&transport, "/").await;

    assert!(!assert_ok!(session.execute_form(&[("Country", "DE")]).await));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn no_matching_form_sends_nothing() {
    let transport = MockTransport::new().page("/", ORDER_PAGE);
    let mut session = open(&transport, "/").await;

    assert!(!assert_ok!(session.execute_form(&[("missing", "v")]).await));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn login_rolls_back_and_tries_the_next_form() {
    let transport = MockTransport::new()
        .page("/login", LOGIN_PAGE)
        .route("/bad", |_| {
            MockResponse::html("<p>Invalid credentials</p>").with_cookie("attempt", "1")
        })
        .route("/good", |request| {
            let user = request.form_value("user").unwrap_or_default();
            MockResponse::html(format!("<h1>Welcome {}</h1>", user))
        });
    let mut session = open(&transport, "/login").await;

    let mut seen = Vec::new();
    let accepted = session
        .login("ada", "secret", |page| {
            seen.push(page.page_content().to_string());
            page.contains("Welcome")
        })
        .await;
    assert!(assert_ok!(accepted));
    assert_eq!(seen, vec!["<p>Invalid credentials</p>", "<h1>Welcome ada</h1>"]);
    assert!(session.contains("Welcome ada"));

    let paths: Vec<String> = transport
        .requests()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/login", "/bad", "/good"]);

    let second = transport.last_request().unwrap();
    assert_eq!(second.form_value("pw"), Some("secret"));
    assert_eq!(second.cookies, vec![("attempt".to_string(), "1".to_string())]);
}

#[tokio::test]
async fn exhausted_login_restores_the_login_page() {
    let transport = MockTransport::new()
        .page("/login", LOGIN_PAGE)
        .route("/bad", |_| MockResponse::html("<p>Nope</p>").with_cookie("attempt", "1"))
        .route("/good", |_| MockResponse::html("<p>Still nope</p>"));
    let mut session = open(&transport, "/login").await;

    let accepted = session
        .login("ada", "secret", |page| page.contains("Welcome"))
        .await;
    assert!(!assert_ok!(accepted));
    assert_eq!(session.url().path(), "/login");
    assert!(session.page_content().contains("action=\"/good\""));
    assert_eq!(session.cookies().get("attempt").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn login_prefers_email_inputs_for_email_usernames() {
    let transport = MockTransport::new()
        .page(
            "/",
            r#"<form method="post" action="/session">
                 <input type="text" name="nickname">
                 <input type="email" name="email">
                 <input type="password" name="password">
               </form>"#,
        )
        .echo("/session");
    let mut session = open(&transport, "/").await;

    let accepted = session
        .login("ada@example.com", "pw", |page| page.contains("method=POST"))
        .await;
    assert!(assert_ok!(accepted));
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.form_value("email"), Some("ada@example.com"));
    assert_eq!(sent.form_value("nickname"), Some(""));
}

#[tokio::test]
async fn cookies_accumulate_across_responses() {
    let transport = MockTransport::new()
        .route("/a", |_| {
            MockResponse::html(r#"<a href="/b">next</a>"#).with_cookie("a", "1")
        })
        .route("/b", |_| {
            MockResponse::html(r#"<a href="/c">next</a>"#)
                .with_cookie("b", "2")
                .with_cookie("a", "3")
        })
        .echo("/c");
    let mut session = open(&transport, "/a").await;

    assert!(assert_ok!(session.click_link("next", false).await));
    assert_eq!(
        transport.last_request().unwrap().cookies,
        vec![("a".to_string(), "1".to_string())]
    );
    assert!(assert_ok!(session.click_link("next", false).await));

    let jar: Vec<(&str, &str)> = session
        .cookies()
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    assert_eq!(jar, vec![("a", "3"), ("b", "2")]);
    assert!(session.contains("cookie:b=2"));
}

#[tokio::test]
async fn cookies_set_during_redirects_are_kept() {
    let transport = MockTransport::new()
        .route("/cookies/set", |_| {
            MockResponse::redirect("/cookies").with_cookie("flavour", "oat")
        })
        .echo("/cookies");
    let session = open(&transport, "/cookies/set").await;

    assert_eq!(session.url().path(), "/cookies");
    assert!(session.contains("cookie:flavour=oat"));
    assert_eq!(session.cookies().get("flavour").map(String::as_str), Some("oat"));
}

#[tokio::test]
async fn orphan_submit_control_is_an_error() {
    let transport = MockTransport::new().page("/", r#"<input type="submit" id="go" value="Go">"#);
    let mut session = open(&transport, "/").await;

    let err = assert_err!(session.click("go", false).await);
    assert!(matches!(err, BrowserError::OrphanSubmit(_)));
}

#[tokio::test]
async fn failed_exchange_leaves_state_untouched() {
    let transport = MockTransport::new()
        .route("/", |_| {
            MockResponse::html(r#"<a href="/broken">broken</a>"#).with_cookie("sid", "x")
        })
        .fail("/broken");
    let mut session = open(&transport, "/").await;
    let before_body = session.page_content().to_string();

    let err = assert_err!(session.click_link("broken", false).await);
    assert!(err.is_transport());
    assert!(matches!(err, BrowserError::ConnectionReset(_)));
    assert_eq!(session.url().path(), "/");
    assert_eq!(session.page_content(), before_body);
    assert_eq!(session.referrer(), Some("http://shop.test/"));
    assert_eq!(session.cookies().len(), 1);
}

#[tokio::test]
async fn error_statuses_still_become_the_page() {
    let transport = MockTransport::new().page("/", r#"<a href="/gone">gone</a>"#);
    let mut session = open(&transport, "/").await;

    assert!(assert_ok!(session.click_link("gone", false).await));
    assert_eq!(session.status(), 404);
    assert!(session.contains("Not Found"));
}

#[tokio::test(start_paused = true)]
async fn actions_are_spaced_by_the_minimum_timeout() {
    let transport = MockTransport::new().page("/", "<p>idle</p>").page("/other", "");
    let config = BrowserConfig::default().with_minimum_timeout(Duration::from_secs(1));
    let mut session = assert_ok!(
        BrowserSession::new(transport.clone(), config, "http://shop.test/").await
    );
    let start = Instant::now();

    assert_ok!(session.click("missing", false).await);
    assert_ok!(session.click("missing", false).await);
    assert!(start.elapsed() >= Duration::from_secs(2));

    let before = Instant::now();
    assert_ok!(session.navigate("/other").await);
    assert_eq!(Instant::now(), before);

    session.set_minimum_timeout(Duration::ZERO);
    let before = Instant::now();
    assert_ok!(session.click("missing", false).await);
    assert_eq!(Instant::now(), before);
}

#[tokio::test]
async fn shutdown_releases_the_transport() {
    let transport = MockTransport::new().page("/", "");
    let session = open(&transport, "/").await;

    assert_ok!(session.shutdown().await);
    assert_eq!(transport.shutdowns(), 1);
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_run_on_spawned_tasks() {
    let transport = MockTransport::new()
        .page("/", r#"<a href="/next">go</a>"#)
        .page("/next", "<p>arrived</p>");

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let transport = transport.clone();
            tokio::spawn(async move {
                let mut session =
                    BrowserSession::new(transport, quick(), "http://shop.test/").await?;
                assert_send(&session);
                let followed = session.click_link("go", false).await?;
                Ok::<_, BrowserError>((followed, session.contains("arrived")))
            })
        })
        .collect();

    for task in tasks {
        let outcome = assert_ok!(task.await);
        assert_eq!(assert_ok!(outcome), (true, true));
    }
    assert_eq!(transport.requests().len(), 4);
}
