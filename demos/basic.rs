//! Example: a counter and a todo list rendered with Lips
//!
//! Run with `RUST_LOG=lips=debug` to watch components render.

use std::time::{Duration, Instant};

use lips::{Dom, Lips, Template, Value};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let lips = Lips::detached();

    lips.register(
        "todo",
        Template::new(r#"<li class="{input.done ? 'done' : 'open'}">{input.label}</li>"#)
            .stylesheet(".done { text-decoration: line-through; }"),
    );

    let app = {
        let mut dom = lips.dom().borrow_mut();
        let body = dom.body().ok_or_else(|| anyhow::anyhow!("document has no body"))?;
        let app = dom.create_element("div");
        dom.set_attribute(app, "id", "app")?;
        dom.append_child(body, app)?;
        app
    };

    let root = lips.root(
        Template::new(
            r#"<section>
                <h1 text="'Todos'"></h1>
                <ul>
                    <for in="state.items">
                        <todo label="{each.label}" done="{each.done}"></todo>
                    </for>
                </ul>
                <p>{state.items.length} items, clicked {state.clicks} times</p>
                <button on-click="state.clicks++">+</button>
            </section>"#,
        )
        .state(serde_json::json!({
            "clicks": 0,
            "items": [
                { "label": "write templates", "done": true },
                { "label": "ship it", "done": false },
            ],
        })),
        "#app",
    )?;

    println!("{}", lips.dom().borrow().inner_html(app));

    let mut items = root.state().get("items").as_array().unwrap_or_default().to_vec();
    items.push(serde_json::json!({ "label": "profit", "done": false }).into());
    root.set_state(Value::object([("items", Value::array(items))]));

    // In-place writes from event bindings are picked up by the tick
    if let Some(button) = root.find("button") {
        lips::dispatch_event(lips.dom(), button, "click");
    }
    lips.run_timers_at(Instant::now() + Duration::from_millis(50));

    println!("{}", lips.dom().borrow().inner_html(app));

    root.destroy();
    Ok(())
}
