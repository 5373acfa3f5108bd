use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

pub fn render<T, F>(format: OutputFormat, value: &T, human: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    Ok(match format {
        OutputFormat::Human => human(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

pub fn emit<T, F>(format: OutputFormat, value: &T, human: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    let rendered = render(format, value, human)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_render_the_same_value() {
        let value = json!({"isValid": true});
        assert_eq!(
            render(OutputFormat::Human, &value, || "ok".into()).unwrap(),
            "ok"
        );
        assert!(render(OutputFormat::Json, &value, String::new)
            .unwrap()
            .contains("\"isValid\": true"));
        assert_eq!(
            render(OutputFormat::Yaml, &value, String::new).unwrap(),
            "isValid: true\n"
        );
    }
}
