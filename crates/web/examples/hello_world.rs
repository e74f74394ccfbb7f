use carafe_http::protocol::{Method, Response};
use carafe_web::routing::{BindContext, RouteMap, Rule};
use carafe_web::{Server, default_error_response, service_fn};
use http::StatusCode;
use serde::Deserialize;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
    #[serde(default)]
    excited: bool,
}

// curl -v http://127.0.0.1:8080/
// curl -v http://127.0.0.1:8080/user/alice
// curl -v http://127.0.0.1:8080/post/42
// curl -v http://127.0.0.1:8080/files/a/b/c.txt
// curl -v -d "msg=hello" http://127.0.0.1:8080/echo
// curl -v -H 'Content-Type: application/json' -d '{"name":"world","excited":true}' http://127.0.0.1:8080/greet
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut map = RouteMap::new();
    map.add(Rule::builder("/", "index").build()?);
    map.add(Rule::builder("/user/<name>", "user").build()?);
    map.add(Rule::builder("/post/<int:id>", "post").build()?);
    map.add(Rule::builder("/files/<path:name>", "files").build()?);
    map.add(Rule::builder("/echo", "echo").methods([Method::Post]).build()?);
    map.add(Rule::builder("/greet", "greet").methods([Method::Post]).build()?);
    let matcher = map.bind(BindContext::default());

    let service = service_fn(|context| match context.route {
        Ok(hit) => match hit.endpoint.as_str() {
            "index" => Response::text("welcome\r\n"),
            "user" => Response::text(format!("hello {}\r\n", hit.values["name"])),
            "post" => Response::text(format!("post #{}\r\n", hit.values["id"])),
            "files" => Response::text(format!("file {}\r\n", hit.values["name"])),
            "echo" => {
                let msg = context.request.form().get("msg").unwrap_or("(no msg)").to_owned();
                Response::text(format!("you said: {msg}\r\n"))
            }
            "greet" => {
                let greeting = context
                    .request
                    .json()
                    .and_then(|v| serde_json::from_value::<Greeting>(v.clone()).ok());
                match greeting {
                    Some(g) => {
                        let bang = if g.excited { "!" } else { "." };
                        let payload = serde_json::json!({ "message": format!("greetings, {}{bang}", g.name) });
                        Response::json(&payload).unwrap_or_else(|_| {
                            Response::text("serialization failed\r\n")
                                .with_status(StatusCode::INTERNAL_SERVER_ERROR)
                        })
                    }
                    None => Response::text("expected a JSON body\r\n").with_status(StatusCode::BAD_REQUEST),
                }
            }
            other => Response::text(format!("unhandled endpoint {other}\r\n")),
        },
        Err(e) => default_error_response(&e),
    });

    info!(port = 8080, workers = 4, "starting");
    let server = Server::builder().host("127.0.0.1").port(8080).workers(4).build();
    server.run(matcher, service)?;
    Ok(())
}
