//! 生成文本中的完成标记
//!
//! - 诱饵报告：标记之前是报告正文，之后是给访客的简短回复
//! - 预算阶段：出现标记即表示预算已收集，标记本身从回复中去掉

pub const REPORT_MARKER: &str = "[RELATORIO_ENVIADO]";
pub const BUDGET_MARKER: &str = "[ORCAMENTO_FINALIZADO]";

const DEFAULT_FOLLOW_UP: &str = "Relatório enviado. Gostaria de um orçamento?";
const DEFAULT_BUDGET_THANKS: &str =
    "Obrigado! Registrei suas informações e nossa equipe entrará em contato em breve.";

/// 诱饵报告的拆分结果
#[derive(Debug, Clone, PartialEq)]
pub struct BaitSplit {
    /// 标记之前的报告正文；没有标记或正文为空时为 None
    pub report: Option<String>,
    /// 给访客的后续回复（不含任何标记）
    pub follow_up: String,
}

impl BaitSplit {
    /// 访客看到的完整消息
    pub fn message(&self) -> String {
        match &self.report {
            Some(report) => format!("{}\n\n{}", report, self.follow_up),
            None => self.follow_up.clone(),
        }
    }
}

/// 按报告标记拆分生成文本
pub fn split_report(text: &str) -> BaitSplit {
    match text.split_once(REPORT_MARKER) {
        Some((report, rest)) => {
            let report = report.trim();
            let follow_up = rest.replace(REPORT_MARKER, "");
            let follow_up = follow_up.trim();
            BaitSplit {
                report: (!report.is_empty()).then(|| report.to_string()),
                follow_up: if follow_up.is_empty() {
                    DEFAULT_FOLLOW_UP.to_string()
                } else {
                    follow_up.to_string()
                },
            }
        }
        None => BaitSplit {
            report: None,
            follow_up: text.trim().to_string(),
        },
    }
}

/// 去掉预算结束标记；返回 (回复, 是否已结束)
pub fn strip_budget_marker(text: &str) -> (String, bool) {
    if text.contains(BUDGET_MARKER) {
        let reply = text.replace(BUDGET_MARKER, "");
        let reply = reply.trim();
        if reply.is_empty() {
            (DEFAULT_BUDGET_THANKS.to_string(), true)
        } else {
            (reply.to_string(), true)
        }
    } else {
        (text.trim().to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_report_with_marker() {
        let split = split_report("Certo, Ana. Seu score...\n[RELATORIO_ENVIADO]\nQuer um orçamento?");
        assert_eq!(split.report.as_deref(), Some("Certo, Ana. Seu score..."));
        assert_eq!(split.follow_up, "Quer um orçamento?");
        assert_eq!(split.message(), "Certo, Ana. Seu score...\n\nQuer um orçamento?");
    }

    #[test]
    fn test_split_report_marker_at_end_uses_default_follow_up() {
        let split = split_report("Relatório completo [RELATORIO_ENVIADO]");
        assert_eq!(split.report.as_deref(), Some("Relatório completo"));
        assert_eq!(split.follow_up, DEFAULT_FOLLOW_UP);
    }

    #[test]
    fn test_split_report_without_marker() {
        let split = split_report("  Só uma resposta  ");
        assert_eq!(split.report, None);
        assert_eq!(split.message(), "Só uma resposta");
    }

    #[test]
    fn test_repeated_marker_never_leaks() {
        let split = split_report("A [RELATORIO_ENVIADO] B [RELATORIO_ENVIADO] C");
        assert_eq!(split.report.as_deref(), Some("A"));
        assert!(!split.message().contains(REPORT_MARKER));
    }

    #[test]
    fn test_strip_budget_marker() {
        assert_eq!(
            strip_budget_marker("Obrigado! [ORCAMENTO_FINALIZADO]"),
            ("Obrigado!".to_string(), true)
        );
        assert_eq!(
            strip_budget_marker("Qual o objetivo?"),
            ("Qual o objetivo?".to_string(), false)
        );
    }

    #[test]
    fn test_bare_budget_marker_gets_thank_you_text() {
        assert_eq!(
            strip_budget_marker("  [ORCAMENTO_FINALIZADO]\n"),
            (DEFAULT_BUDGET_THANKS.to_string(), true)
        );
    }
}
