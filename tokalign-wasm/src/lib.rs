use tokalign_core::{
    collect_chunks, group_units, parse_dictionary, parse_tokens, write_csv, write_dictionary, AlignOptions,
    AlignmentEngine, AssociationDictionary, DictionaryOptions, Measure,
};
use wasm_bindgen::prelude::*;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Builds a dictionary from two token tables and returns it in file form.
#[wasm_bindgen]
pub fn build_dictionary(
    target_tsv: &str,
    original_tsv: &str,
    measure: &str,
    bidirectional: bool,
) -> Result<String, JsValue> {
    let target = parse_tokens(target_tsv).map_err(js_err)?;
    let original = parse_tokens(original_tsv).map_err(js_err)?;
    let measure: Measure = measure.parse().map_err(js_err)?;
    let options = DictionaryOptions { measure, bidirectional, ..DictionaryOptions::default() };
    let limit = options.limit;
    let mut dictionary = AssociationDictionary::new(options).map_err(js_err)?;
    let chunks = collect_chunks(&target, &original).map_err(js_err)?;
    dictionary.update(&chunks).map_err(js_err)?;
    dictionary.make().map_err(js_err)?;
    write_dictionary(&dictionary, limit).map_err(js_err)
}

/// Aligns every shared verse. `format` is `csv` or `human`.
#[wasm_bindgen]
pub fn align_tables(
    dictionary_text: &str,
    original_tsv: &str,
    target_tsv: &str,
    format: &str,
) -> Result<String, JsValue> {
    let csv = match format {
        "csv" => true,
        "human" => false,
        other => return Err(JsValue::from_str(&format!("unknown output format `{other}`"))),
    };
    let dictionary = parse_dictionary(dictionary_text, DictionaryOptions::default()).map_err(js_err)?;
    let original = parse_tokens(original_tsv).map_err(js_err)?;
    let target = parse_tokens(target_tsv).map_err(js_err)?;
    let engine = AlignmentEngine::new(&dictionary, AlignOptions::default()).map_err(js_err)?;
    let mut out = String::new();
    for unit in group_units(&original, &target).map_err(js_err)? {
        let alignment = engine.align(&unit.reference, &unit.original, &unit.target).map_err(js_err)?;
        if csv {
            out.push_str(&write_csv(&alignment));
        } else {
            out.push_str(&alignment.to_string());
        }
    }
    Ok(out)
}
