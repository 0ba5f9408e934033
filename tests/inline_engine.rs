use insta::assert_snapshot;
use wenyan::application::inline::{
    Document, InlineError, ROOT_ID, Stylesheet, convert, inline_styles, resolve_variables,
};

#[test]
fn root_variables_are_inlined() {
    let html = convert("<h1>Title</h1>", &[":root{--c: red;} h1{color: var(--c);}"])
        .expect("convert");
    assert_snapshot!(html, @r#"<section id="wenyan" data-provider="WenYan"><h1 style="color: red">Title</h1></section>"#);
}

#[test]
fn before_rule_becomes_leading_section() {
    let html = convert(
        "<h2>Title</h2>",
        &["h2::before{content: '›'; color: blue;}"],
    )
    .expect("convert");
    assert_snapshot!(html, @r#"<section id="wenyan" data-provider="WenYan"><h2><section style="color: blue">›</section>Title</h2></section>"#);
}

#[test]
fn later_stylesheet_wins_for_the_same_selector() {
    let html = convert(
        "<pre><code>x</code></pre>",
        &["pre { font-size: 12px; }", "pre { font-size: 14px; }"],
    )
    .expect("convert");
    assert!(html.contains(r#"<pre style="font-size: 14px">"#), "{html}");
}

#[test]
fn block_equation_graphic_replaces_its_container() {
    let fragment = concat!(
        r#"<p class="block-equation" style="color: red">"#,
        r#"<mjx-container class="MathJax"><svg width="120" height="40" viewBox="0 0 120 40"><g class="mjx-solid"></g></svg></mjx-container>"#,
        "</p>",
    );
    let html = convert(fragment, &["p { margin: 0; }"]).expect("convert");
    assert_snapshot!(html, @r#"<section id="wenyan" data-provider="WenYan"><p class="block-equation" style="text-align: center; margin-bottom: 1rem"><svg viewBox="0 0 120 40" style="width: 120px; height: 40px"><g fill="none" stroke-width="70"></g></svg></p></section>"#);
}

#[test]
fn undefined_variable_is_left_verbatim() {
    let html = convert("<p>x</p>", &["p { color: var(--missing); }"]).expect("convert");
    assert!(html.contains(r#"<p style="color: var(--missing)">x</p>"#), "{html}");
}

#[test]
fn quoted_content_is_unquoted() {
    let html = convert("<blockquote>q</blockquote>", &["blockquote::after { content: \"★\"; }"])
        .expect("convert");
    assert!(html.contains("<blockquote>q<section>★</section></blockquote>"), "{html}");
}

#[test]
fn code_whitespace_survives_serialization() {
    let html = convert("<pre><code>a  b\nc</code></pre>", &[""]).expect("convert");
    assert!(html.contains("<code>a&nbsp;&nbsp;b<br>c</code>"), "{html}");
}

#[test]
fn resolved_stylesheet_is_stable_under_resolution() {
    let css = "h1 { color: red; }\np { margin: 0; }";
    assert_eq!(resolve_variables(css), css);
    let with_root = ":root { --x: 1px; }h1 { color: red; }";
    assert_eq!(resolve_variables(with_root), "h1 { color: red; }");
}

#[test]
fn inlining_is_deterministic() {
    let css = "#wenyan { color: #333; } p { color: red; } div p { color: blue; margin: 0; }";
    let sheet = Stylesheet::parse(css).expect("parse");
    let run = || {
        let mut doc = Document::wrap_fragment("<div><p>a</p></div><p>b</p>", ROOT_ID);
        inline_styles(&mut doc, &sheet);
        doc.outer_html(doc.root()).expect("serialize")
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.contains(r#"<p style="color: blue; margin: 0">a</p>"#));
    assert!(first.contains(r#"<p style="color: red">b</p>"#));
}

#[test]
fn later_rule_wins_regardless_of_selector_weight() {
    let html = convert(
        r#"<p id="lead" class="intro">x</p>"#,
        &["#wenyan p#lead.intro { color: green; } p { color: gray; }"],
    )
    .expect("convert");
    assert!(html.contains(r#"style="color: gray""#), "{html}");
}

#[test]
fn malformed_stylesheet_fails_the_conversion() {
    let err = convert("<p>x</p>", &["p { color: red; }}"]).expect_err("parse failure");
    assert!(matches!(err, InlineError::Stylesheet { .. }), "{err:?}");
}

#[test]
fn math_container_without_graphic_is_rejected() {
    let err = convert("<p><mjx-container></mjx-container></p>", &[""])
        .expect_err("missing graphic");
    assert!(matches!(err, InlineError::MissingEquationGraphic), "{err:?}");
}

#[test]
fn functional_values_are_inlined_whole() {
    let html = convert(
        "<p>x</p>",
        &["p { border: 1px solid rgba(0, 0, 0, 0.1); color: rgb(1, 2, 3); }"],
    )
    .expect("convert");
    assert!(
        html.contains(r#"<p style="border: 1px solid rgba(0, 0, 0, 0.1); color: rgb(1, 2, 3)">x</p>"#),
        "{html}"
    );
}

#[test]
fn functional_pseudo_classes_select_elements() {
    let html = convert(
        r#"<p class="x">a</p><p>b</p><ul><li>1</li><li>2</li></ul>"#,
        &["p:not(.x) { color: red; } li:nth-child(2) { margin: 0; }"],
    )
    .expect("convert");
    assert!(html.contains(r#"<p class="x">a</p><p style="color: red">b</p>"#), "{html}");
    assert!(html.contains(r#"<li>1</li><li style="margin: 0">2</li>"#), "{html}");
}

#[test]
fn base64_svg_in_trailing_declaration_is_materialized() {
    let html = convert(
        "<h1>Title</h1>",
        &[r#"h1::after { content: ""; background-image: url(data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=) }"#],
    )
    .expect("convert");
    assert_snapshot!(html, @r#"<section id="wenyan" data-provider="WenYan"><h1>Title<section><svg></svg></section></h1></section>"#);
}

#[test]
fn body_selectors_reach_the_fragment() {
    let html = convert("<h1>T</h1>", &["body h1 { color: red; } body > h1 { margin: 0; }"])
        .expect("convert");
    assert!(html.contains(r#"<h1 style="color: red">T</h1>"#), "{html}");
}

#[test]
fn inline_style_with_data_uri_is_kept_intact() {
    let html = convert(
        r#"<div style="background: url(data:image/png;base64,AAAA) no-repeat">x</div>"#,
        &["div { color: red; }"],
    )
    .expect("convert");
    assert!(
        html.contains(r#"<div style="background: url(data:image/png;base64,AAAA) no-repeat; color: red">x</div>"#),
        "{html}"
    );
}
