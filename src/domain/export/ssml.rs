//! Export Context - SSML 与纯文本导出

use crate::domain::text_segmenter::SpeakableUnit;
use crate::domain::voice::Speed;

/// 句间停顿
pub const SENTENCE_BREAK: &str = "500ms";

/// 渲染 SSML：一个 `<voice>`/`<prosody>` 包裹，每句一个 `<s>`，句间固定停顿
pub fn render_ssml(units: &[SpeakableUnit], voice_name: &str, speed: Speed) -> String {
    let mut ssml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    ssml.push_str(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"zh-CN\">\n",
    );
    ssml.push_str(&format!("  <voice name=\"{}\">\n", escape_xml(voice_name)));
    ssml.push_str(&format!("    <prosody rate=\"{}\">\n", speed.value()));

    for (i, unit) in units.iter().enumerate() {
        ssml.push_str(&format!("      <s>{}</s>\n", escape_xml(unit.text())));
        if i + 1 < units.len() {
            ssml.push_str(&format!("      <break time=\"{}\"/>\n", SENTENCE_BREAK));
        }
    }

    ssml.push_str("    </prosody>\n");
    ssml.push_str("  </voice>\n");
    ssml.push_str("</speak>");
    ssml
}

/// 纯文本导出，句与句之间空一行
pub fn render_plain_text(units: &[SpeakableUnit]) -> String {
    units
        .iter()
        .map(|u| u.text())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_structure() {
        let units = vec![
            SpeakableUnit::structural("第一章"),
            SpeakableUnit::speech("他说：<你好> & \"再见\"。"),
        ];
        let ssml = render_ssml(&units, "zh-CN-YunyangNeural", Speed::new(1.2));

        assert!(ssml.contains("<voice name=\"zh-CN-YunyangNeural\">"));
        assert!(ssml.contains("<prosody rate=\"1.2\">"));
        assert!(ssml.contains("<s>第一章</s>"));
        assert!(ssml.contains("<s>他说：&lt;你好&gt; &amp; &quot;再见&quot;。</s>"));
        assert_eq!(ssml.matches("<break time=\"500ms\"/>").count(), 1);
        assert!(ssml.ends_with("</speak>"));
    }

    #[test]
    fn test_plain_text() {
        let units = vec![SpeakableUnit::speech("一。"), SpeakableUnit::speech("二。")];
        assert_eq!(render_plain_text(&units), "一。\n\n二。");
        assert_eq!(render_plain_text(&[]), "");
    }

    #[test]
    fn test_escape_apostrophe() {
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }
}
