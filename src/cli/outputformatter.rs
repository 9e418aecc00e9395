use serde::Serialize;
use serde_json::Value;

const MAX_COL_WIDTH: usize = 60;

/// True when `ECOCHAIN_OUTPUT=json` asks for raw JSON instead of tables.
pub fn json_output_forced() -> bool {
    std::env::var("ECOCHAIN_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

/// Render a list of records as an ASCII table, or `None` when there is nothing
/// tabular to show (empty list, non-array value).
pub fn render_records<T: Serialize>(items: &[T]) -> Option<String> {
    let val = serde_json::to_value(items).ok()?;
    let (cols, rows) = table_from_array(&val)?;
    if rows.is_empty() { return None; }

    let mut widths: Vec<usize> = cols.iter().map(|s| display_len(s).min(MAX_COL_WIDTH)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(MAX_COL_WIDTH); }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(sep.clone());
    out.push(build_row(&cols, &widths));
    out.push(sep.clone());
    for r in &rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out.push(format!("rows: {}", rows.len()));
    Some(out.join("\n"))
}

/// Print records as a table, falling back to pretty JSON.
pub fn print_records<T: Serialize>(label: &str, items: &[T]) {
    println!("{}:", label);
    if !json_output_forced() {
        if let Some(table) = render_records(items) {
            println!("{}", table);
            return;
        }
    }
    print_json(&items);
}

pub fn print_json<T: Serialize + ?Sized>(v: &T) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("could not render output: {}", e),
    }
}

// Union of object keys (sorted) as columns; scalars become a single "value" column.
fn table_from_array(val: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let arr = val.as_array()?;
    let mut keys: Vec<String> = Vec::new();
    let mut all_objects = true;
    for el in arr {
        if let Value::Object(map) = el {
            for k in map.keys() { if !keys.contains(k) { keys.push(k.clone()); } }
        } else {
            all_objects = false;
        }
    }
    if all_objects && !keys.is_empty() {
        keys.sort();
        let rows = arr
            .iter()
            .filter_map(|el| el.as_object())
            .map(|map| keys.iter().map(|k| map.get(k).map(to_cell_string).unwrap_or_default()).collect())
            .collect();
        Some((keys, rows))
    } else {
        let rows = arr.iter().map(|el| vec![to_cell_string(el)]).collect();
        Some((vec!["value".to_string()], rows))
    }
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // tagged variants such as {"Pending": null} read better as their tag
        Value::Object(map) if map.len() == 1 && map.values().all(Value::is_null) => {
            map.keys().next().cloned().unwrap_or_default()
        }
        other => other.to_string(),
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let pad = w.saturating_sub(display_len(&text));
        s.push(' ');
        if is_numeric_like(&cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty() && st.chars().all(|c| c.is_ascii_digit())
}
