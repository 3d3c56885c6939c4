use autorag_core::traits::MetricMap;
use serde_json::Value;

/// Numeric value of `name` in an evaluator's output. Numbers and numeric
/// strings count; anything else (absent, null, text, non-finite) is `None`.
pub fn extract_metric(metrics: &MetricMap, name: &str) -> Option<f64> {
    let value = match metrics.get(name)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> MetricMap {
        let mut m = MetricMap::new();
        m.insert("context_precision".to_string(), value);
        m
    }

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(extract_metric(&map(json!(0.42)), "context_precision"), Some(0.42));
        assert_eq!(extract_metric(&map(json!(1)), "context_precision"), Some(1.0));
        assert_eq!(extract_metric(&map(json!(" 0.5 ")), "context_precision"), Some(0.5));
    }

    #[test]
    fn everything_else_is_none() {
        assert_eq!(extract_metric(&map(json!("n/a")), "context_precision"), None);
        assert_eq!(extract_metric(&map(json!("NaN")), "context_precision"), None);
        assert_eq!(extract_metric(&map(Value::Null), "context_precision"), None);
        assert_eq!(extract_metric(&map(json!([0.5])), "context_precision"), None);
        assert_eq!(extract_metric(&map(json!(0.5)), "faithfulness"), None);
    }
}
