//! Optional jq pre-processing of each input document before it is validated.
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input` and collect every output as JSON.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let arena = load::Arena::default();
    let modules = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()))
        .load(&arena, load::File { code: filter_src, path: () })
        .map_err(format_parse_errors)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    filter
        .run((Ctx::new([], &inputs), Val::from(input.clone())))
        .map(|output| to_json(output.map_err(|e| anyhow!("jq runtime error: {e:?}"))?))
        .collect()
}

/// `Val` renders as JSON text.
fn to_json(val: Val) -> Result<Value> {
    let text = val.to_string();
    serde_json::from_str(&text).with_context(|| format!("jq produced non-JSON output `{text}`"))
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("cannot parse jq filter `{}`: {err:?}", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("jq filter `{}` uses undefined {undef:?} `{name}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}
