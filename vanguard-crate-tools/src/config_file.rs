use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// 从 TOML 文件加载配置
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let content =
        fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;

    parse_toml(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))
}

/// 从 TOML 字符串解析配置
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    Ok(toml::from_str(content)?)
}

/// 保存配置到 TOML 文件
pub fn save_toml<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(value).context("序列化配置失败")?;

    fs::write(path.as_ref(), content).with_context(|| format!("写入配置文件失败: {:?}", path.as_ref()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        enabled: bool,
    }

    #[test]
    fn test_parse_toml_with_default() {
        let sample: Sample = parse_toml("name = \"clouds\"").unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "clouds".to_string(),
                enabled: false
            }
        );
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load_toml::<Sample, _>("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{err:#}").contains("读取配置文件失败"));
    }
}
