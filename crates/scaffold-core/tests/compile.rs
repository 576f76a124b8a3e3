//! Whole-pipeline tests: source files on disk in, CSS out.

use std::fs;
use std::path::Path;

use insta::assert_snapshot;
use scaffold_core::{
    BuildRequest, CompiledDocument, Compiler, CompilerConfig, FormatterConfig, ScaffoldError, build,
};
use scaffold_error_reporting::Severity;

fn minified() -> CompilerConfig {
    CompilerConfig {
        formatter: FormatterConfig {
            compress: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn compile_in(dir: &Path, config: CompilerConfig, source: &str, flags: &[&str]) -> Result<CompiledDocument, ScaffoldError> {
    let path = dir.join("site.css");
    fs::write(&path, source).unwrap();
    let flags: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
    Compiler::new(config).compile_file(&path, &flags, &[])
}

fn compile_with(config: CompilerConfig, source: &str) -> Result<CompiledDocument, ScaffoldError> {
    let dir = tempfile::tempdir().unwrap();
    compile_in(dir.path(), config, source, &[])
}

fn css(source: &str) -> String {
    compile_with(minified(), source).unwrap().css
}

fn fatal_code(err: ScaffoldError) -> String {
    match err {
        ScaffoldError::Fatal(msg) => msg.code.unwrap_or_default(),
        other => panic!("expected a fatal diagnostic, got {other:?}"),
    }
}

#[test]
fn nested_rule_flattens() {
    assert_eq!(css(".a { .b { color: red; } }"), ".a .b{color:red}");
}

#[test]
fn comma_branches_distribute() {
    assert_eq!(
        css(".a { .b, .c { color: red; } }"),
        ".a .b{color:red}.a .c{color:red}"
    );
}

#[test]
fn media_discards_outer_ancestor() {
    assert_eq!(
        css(".a { @media print { .b { color: red; } } }"),
        "@media print{.b{color:red}}"
    );
}

#[test]
fn mixin_argument_and_default() {
    assert_eq!(
        css("=button($color=blue){background:$color;}\n.btn{+button(red);}\n.btn2{+button;}"),
        ".btn{background:red}.btn2{background:blue}"
    );
}

#[test]
fn mixin_without_default_requires_argument() {
    let err = compile_with(minified(), "=pad($n){padding:$n;}\n.a{+pad;}").unwrap_err();
    assert_eq!(fatal_code(err), "S-3-1");
}

#[test]
fn undefined_constant_is_fatal() {
    let err = compile_with(minified(), ".a{margin:$undefined;}").unwrap_err();
    assert_eq!(fatal_code(err), "S-2-1");
}

#[test]
fn undefined_constant_in_untaken_branch_is_fatal() {
    let err = compile_with(minified(), "@if(1 == 2){.a{margin:$undefined;}}").unwrap_err();
    assert_eq!(fatal_code(err), "S-2-1");
}

#[test]
fn cyclic_mixins_terminate_with_warning() {
    let compiled = compile_with(minified(), "=a{+b;} =b{+a;}\n.x{+a;}").unwrap();
    assert_eq!(compiled.css, ".x{}");
    assert_eq!(compiled.diagnostics.len(), 1);
    assert_eq!(compiled.diagnostics[0].code.as_deref(), Some("S-3-3"));
    assert_eq!(compiled.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn warning_promoted_by_threshold() {
    let config = CompilerConfig {
        error_threshold: 1,
        ..minified()
    };
    let err = compile_with(config, "=a{+a;}\n.x{+a;}").unwrap_err();
    assert_eq!(fatal_code(err), "S-3-3");
}

#[test]
fn unknown_mixin_is_informational() {
    let compiled = compile_with(minified(), ".a{color:red;+nope;}").unwrap();
    assert_eq!(compiled.css, ".a{color:red}");
    assert_eq!(compiled.diagnostics[0].severity, Severity::Info);

    let strict = CompilerConfig {
        error_threshold: 2,
        ..minified()
    };
    let err = compile_with(strict, ".a{color:red;+nope;}").unwrap_err();
    assert_eq!(fatal_code(err), "S-3-2");
}

#[test]
fn adjacent_mixin_definitions_and_calls() {
    assert_eq!(
        css("=a{x:1;}=b{y:2;}\n.x{+a;+b;}"),
        ".x{x:1;y:2}"
    );
}

#[test]
fn commented_out_markers_are_inert() {
    let source = "/* usage: .x{ +button; } @include 'missing'; */\n.a{color:red;}";
    let compiled = compile_with(minified(), source).unwrap();
    assert!(compiled.css.ends_with(".a{color:red}"));
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn flags_apply_to_mixin_output() {
    let source = "=ie{@flag(ie6){zoom:1;}}\n.a{+ie;}";
    let dir = tempfile::tempdir().unwrap();
    let on = compile_in(dir.path(), minified(), source, &["ie6"]).unwrap();
    assert_eq!(on.css, ".a{zoom:1}");
    let off = compile_in(dir.path(), minified(), source, &[]).unwrap();
    assert_eq!(off.css, ".a{}");
}

#[test]
fn conditionals_see_constants() {
    assert_eq!(
        css("@constants { mode: dark; }\n@if($mode == dark){ body { background: black; } } @else { body { background: white; } }"),
        "body{background:black}"
    );
}

#[test]
fn loops_expand() {
    assert_eq!(
        css("@for $i from 1 to 3 { .m-$i { margin: {$i}px; } }"),
        ".m-1{margin:1px}.m-2{margin:2px}.m-3{margin:3px}"
    );
}

#[test]
fn grid_constants_and_baseline() {
    assert_eq!(
        css("@grid { column-count: 12; baseline: 18; grid-width: 960; left-gutter-width: 10; right-gutter-width: 10; }\n.col { width: $columns_3; margin-bottom: baseline(2); }"),
        ".col{width:220px;margin-bottom:36px}"
    );
}

#[test]
fn color_functions() {
    assert_eq!(
        css(".a { color: cmyk(0, 100, 100, 0); background: hsla(0, 100%, 50%, 0.5); }"),
        ".a{color:#ff0000;background:rgba(128,0,0,0.5)}"
    );
}

#[test]
fn baseline_without_grid_is_fatal() {
    let err = compile_with(minified(), ".a{margin:baseline(2);}").unwrap_err();
    assert_eq!(fatal_code(err), "S-8-1");
}

#[test]
fn includes_and_mixins_across_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("partials")).unwrap();
    fs::write(
        dir.path().join("partials/base.css"),
        "=shared{margin:0;}\n.base{color:red;}\n",
    )
    .unwrap();

    let compiled = compile_in(
        dir.path(),
        minified(),
        "@include 'partials/base';\n.main { +shared; }",
        &[],
    )
    .unwrap();
    assert_eq!(compiled.css, ".base{color:red}.main{margin:0}");
    assert!(compiled.last_modified.is_some());
}

#[test]
fn global_constants_from_config() {
    let mut config = minified();
    config.constants.global.insert("accent".into(), "#0a0".into());
    let compiled = compile_with(config, ".a{color:$accent;}").unwrap();
    assert_eq!(compiled.css, ".a{color:#0a0}");
}

#[test]
fn pretty_output() {
    let source = r#"
@constants { brand: #336699; }
=rounded($r=4px) { border-radius: $r; }
.nav {
  color: $brand; // brand color
  a { +rounded(2px); &:hover { color: red } }
}
@media print { .nav { display: none } }
"#;
    let compiled = compile_with(CompilerConfig::default(), source).unwrap();
    assert_snapshot!(compiled.css.trim_end(), @r"
    .nav {
      color: #336699;
    }

    .nav a {
      border-radius: 2px;
    }

    .nav a:hover {
      color: red;
    }

    @media print {
      .nav {
        display: none;
      }
    }
    ");
}

#[test]
fn recompiling_output_is_a_fixed_point() {
    let source = r#"
@constants { brand: #336699; gap: 10px; }
=box($pad=$gap) { padding: $pad; /* box */ }
@import url("print.css") print;
.nav, .footer {
  color: $brand;
  ul { +box; li { &.active, &:hover { color: red } } }
  @media (max-width: 600px) { .menu { display: none } }
}
"#;
    for config in [CompilerConfig::default(), minified()] {
        let dir = tempfile::tempdir().unwrap();
        let once = compile_in(dir.path(), config.clone(), source, &[]).unwrap().css;
        let twice = compile_in(dir.path(), config, &once, &[]).unwrap().css;
        assert_eq!(once, twice);
    }
}

#[test]
fn build_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.css");
    let bad = dir.path().join("bad.css");
    let other = dir.path().join("other.css");
    fs::write(&good, ".a { .b { x: 1 } }").unwrap();
    fs::write(&bad, ".c { y: $missing; }").unwrap();
    fs::write(&other, ".d { z: 2 }").unwrap();

    let compiler = Compiler::new(minified());
    let output = build(&compiler, &BuildRequest::new([good, bad.clone(), other]));

    assert_eq!(output.css, ".a .b{x:1}.d{z:2}");
    assert_eq!(output.length, output.css.len());
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].path, bad);
    assert_eq!(output.failures[0].diagnostic.code.as_deref(), Some("S-2-1"));
    assert_eq!(output.all_diagnostics().count(), 1);
}
