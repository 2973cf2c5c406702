use markup_lit::{ComponentRef, Document, EvalError, EvalErrorKind, RenderError, Session, Value};
use markup_macros::{component, markup};

// ── Components ──────────────────────────────────────────────────────────

#[component(name = "Greeting")]
fn greeting(name: String, excited: Option<bool>) -> Result<Value, EvalError> {
    let mark = if excited.unwrap_or(false) { "!" } else { "." };
    Ok(Value::String(format!("Hello, {name}{mark}")))
}

#[component(name = "Total")]
fn total(items: Vec<Value>, scale: Option<f64>) -> Result<Value, EvalError> {
    let sum: f64 = items.iter().map(Value::to_number).sum();
    Ok(Value::Number(sum * scale.unwrap_or(1.0)))
}

#[component(name = "Frame")]
fn frame(children: Value, hidden: bool) -> Result<Value, EvalError> {
    if hidden {
        return Ok(Value::Null);
    }
    Ok(children)
}

#[component]
fn status_line() -> Result<Value, EvalError> {
    Ok(Value::from("ok"))
}

fn session() -> Session {
    Session::new().with_document(Document::new())
}

fn render(session: &Session, template: &markup_lit::Template<'_>) -> String {
    session.html(template).unwrap().to_html()
}

// ── markup! ─────────────────────────────────────────────────────────────

#[test]
fn test_markup_without_interpolations() {
    let template = markup!("<p>plain</p>");
    assert_eq!(template.strings(), &["<p>plain</p>"]);
    assert_eq!(template.interpolation_count(), 0);
}

#[test]
fn test_markup_splits_and_records_sources() {
    let count = 3;
    let kind = "warning";
    let template = markup!("<p class=${kind}>Count: ${count + 1}</p>");
    assert_eq!(template.strings(), &["<p class=", ">Count: ", "</p>"]);
    assert_eq!(template.values(), &[Value::from("warning"), Value::from(4)]);
    assert_eq!(template.source_of(1), Some("count + 1"));
}

#[test]
fn test_markup_renders_to_html() {
    let items = vec!["a", "b"];
    let template = markup!("<ul>{${items}.map(x => <li>{x}</li>)}</ul>");
    assert_eq!(render(&session(), &template), "<ul><li>a</li><li>b</li></ul>");
}

#[test]
fn test_markup_values_are_borrowed() {
    let title = String::from("Docs");
    let template = markup!("<h1>${title}</h1>");
    assert_eq!(render(&session(), &template), "<h1>Docs</h1>");
    assert_eq!(title, "Docs");
}

#[test]
fn test_markup_escaped_interpolation_is_text() {
    let template = markup!("<p title=\"$${literal}\">$5</p>");
    assert_eq!(template.interpolation_count(), 0);
    assert_eq!(render(&session(), &template), "<p title=\"${literal}\">$5</p>");
}

#[test]
fn test_markup_expression_source_in_errors() {
    let missing = Value::Null;
    let template = markup!("<p>{${missing}.name}</p>");
    let err = match session().html(&template) {
        Err(RenderError::Eval(e)) => e,
        other => panic!("expected an evaluation error, got {other:?}"),
    };
    assert_eq!(err.kind, EvalErrorKind::Expression);
    assert!(err.message.contains("${missing}.name"), "{}", err.message);
}

// ── #[component] ────────────────────────────────────────────────────────

#[test]
fn test_component_name() {
    use markup_lit::Component;
    assert_eq!(GreetingComponent.name(), "Greeting");
    assert_eq!(StatusLineComponent.name(), "StatusLine");
}

#[test]
fn test_component_string_and_optional_bool() {
    let greeting = Value::Component(ComponentRef::new(GreetingComponent));
    let session = session();

    let template = markup!("<div><${greeting} name=\"Ada\" /></div>");
    assert_eq!(render(&session, &template), "<div>Hello, Ada.</div>");

    let template = markup!("<div><${greeting} name=\"Ada\" excited /></div>");
    assert_eq!(render(&session, &template), "<div>Hello, Ada!</div>");

    let template = markup!("<div><${greeting} name=\"Ada\" excited={null} /></div>");
    assert_eq!(render(&session, &template), "<div>Hello, Ada.</div>");
}

#[test]
fn test_component_array_and_number() {
    let total = Value::Component(ComponentRef::new(TotalComponent));
    let prices = vec![1, 2, 3];
    let template = markup!("<span><${total} items=${prices} scale={2} /></span>");
    assert_eq!(render(&session(), &template), "<span>12</span>");
}

#[test]
fn test_component_receives_children() {
    let frame = Value::Component(ComponentRef::new(FrameComponent));
    let template = markup!("<section><${frame} hidden={false}><b>in</b></${frame}></section>");
    assert_eq!(render(&session(), &template), "<section><b>in</b></section>");

    let template = markup!("<section><${frame} hidden={true}><b>in</b></${frame}></section>");
    assert_eq!(render(&session(), &template), "<section></section>");
}

#[test]
fn test_component_without_params() {
    let status = Value::Component(ComponentRef::new(StatusLineComponent));
    let template = markup!("<p><${status} ignored=\"x\" /></p>");
    assert_eq!(render(&session(), &template), "<p>ok</p>");
}

#[test]
fn test_component_rejects_wrong_type() {
    let greeting = Value::Component(ComponentRef::new(GreetingComponent));
    let template = markup!("<div><${greeting} name={42} /></div>");
    let err = match session().html(&template) {
        Err(RenderError::Eval(e)) => e,
        other => panic!("expected an evaluation error, got {other:?}"),
    };
    assert_eq!(err.kind, EvalErrorKind::TypeError);
    assert_eq!(err.message, "expected prop `name` to be a string, got number");
}

#[test]
fn test_component_rejects_missing_required_prop() {
    let frame = Value::Component(ComponentRef::new(FrameComponent));
    let template = markup!("<div><${frame} /></div>");
    let err = match session().html(&template) {
        Err(RenderError::Eval(e)) => e,
        other => panic!("expected an evaluation error, got {other:?}"),
    };
    assert_eq!(err.kind, EvalErrorKind::TypeError);
    assert!(err.message.contains("missing required prop: hidden"));
}

#[test]
fn test_component_as_descriptor_is_not_called() {
    let greeting = Value::Component(ComponentRef::new(GreetingComponent));
    let template = markup!("<${greeting} name={7} />");
    // wrong prop types only surface when the component is rendered
    let value = Session::new().jsx(&template).unwrap();
    let element = value.as_element().unwrap();
    assert_eq!(element.props().get("name"), Some(&Value::from(7)));
}
