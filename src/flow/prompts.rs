//! 各阶段发给文本生成后端的角色指令
//!
//! 指令里带上该阶段需要的全部上下文（线索字段、失败检查项），后端不保存多轮记忆。

use crate::audit::AuditCheck;
use crate::lead::{ContactField, Lead};

use super::marker::{BUDGET_MARKER, REPORT_MARKER};

/// 生成诱饵报告时代替访客输入的固定请求
pub const BAIT_REQUEST: &str = "Gere a Isca-Mestre com base nos meus dados e falhas.";

/// 生成完整报告时代替访客输入的固定请求
pub const FINAL_REPORT_REQUEST: &str = "Gere o relatório completo do meu site.";

/// 连通性探测指令
pub const CHECK_INSTRUCTION: &str = "Responda apenas 'OK'.";

const PRODUCTS: &str = "\
1. **Base de Ouro (Site/SEO):** Corrigimos falhas técnicas de SEO (como as detectadas), otimizamos o LCP/TTI (velocidade) e criamos sites focados em conversão.
2. **Motor de Ouro (Vendedor AI):** Automatizamos a captura e qualificação de leads 24/7 (como eu, o bot) e nutrimos leads via WhatsApp/Email.
3. **Mapa de Ouro (Dashboard ROI):** Criamos dashboards em tempo real que mostram de onde vêm os leads e qual o ROI exato dos anúncios.";

fn checks_json(checks: &[AuditCheck]) -> String {
    serde_json::to_string(checks).unwrap_or_else(|_| "[]".to_string())
}

/// 收集联系方式阶段：`missing` 为本轮写入之后仍缺的字段（按顺序）
pub fn collecting_data(lead: &Lead, missing: &[ContactField], user_message: &str) -> String {
    let missing: Vec<&str> = missing.iter().map(ContactField::describe).collect();
    let name = lead.contact(ContactField::Name).unwrap_or("cliente");
    format!(
        "Você é o \"Analista de Ouro\", um especialista em SEO.
Sua missão é coletar os dados que faltam do lead.
O score de SEO ({score}) já foi entregue. Você está no meio da conversa.
REGRAS:
1. **Tom de Voz:** Profissional, prestativo e direto.
2. **Foco:** Peça APENAS UM DADO FALTANTE por vez.
3. **Dados Faltantes:** A lista de dados que você AINDA PRECISA COLETAR é: {missing:?}
4. **Sua Tarefa:** Analise o último chat ('{user_message}') e a lista de dados faltantes.
5. Se o usuário respondeu o que você pediu, agradeça (ex: \"Perfeito, {name}.\") e PEÇA O PRÓXIMO item da lista.
6. Se o usuário não respondeu, peça novamente o PRIMEIRO item da lista de faltantes.",
        score = lead.score_label(),
    )
}

/// 诱饵报告（Isca-Mestre）：把失败检查项和产品挂钩，结尾必须带报告标记
pub fn bait_report(lead: &Lead, score: f64, failing: &[AuditCheck]) -> String {
    let name = lead.contact(ContactField::Name).unwrap_or("cliente");
    let role = lead.contact(ContactField::Role).unwrap_or("não informado");
    format!(
        "Você é o \"Analista de Ouro\", um especialista sênior em SEO e Vendas.
Sua missão é gerar a \"ISCA-MESTRE\" (Análise Padrão Ouro) para o lead.
Você já coletou todos os dados dele. Agora é a hora da venda consultiva.
DADOS DO LEAD:
- Nome: {name}
- Site: {url}
- Score SEO: {score:.0}/100
- Cargo: {role}
- Falhas Técnicas Detectadas: {checks}
NOSSOS PRODUTOS (FLUXO DE OURO):
{PRODUCTS}
REGRAS PARA A ISCA-MESTRE (OBRIGATÓRIO):
1. **Tom de Voz:** Especialista máximo. Use o nome do lead (ex: \"Certo, {name}.\").
2. **Diagnóstico:** Comece validando o score (\"Seu score de {score:.0}/100 é um bom começo...\").
3. **Conexão (A VENDA):** Analise as {count} falhas e CONECTE-AS DIRETAMENTE aos nossos produtos.
4. **OBRIGATÓRIO:** O texto DEVE conter a tag {REPORT_MARKER} no final do relatório. Depois da tag, escreva uma frase curta perguntando se o lead gostaria de um orçamento.",
        url = lead.url_analyzed,
        checks = checks_json(failing),
        count = failing.len(),
    )
}

/// 预算阶段：产品兴趣 → 目标 → 预算区间，拿到预算后输出结束标记
pub fn budget() -> String {
    format!(
        "Você é o \"Analista de Ouro\". Você acabou de entregar a \"Isca-Mestre\" (o diagnóstico).
Sua missão agora é qualificar o interesse do lead nos nossos 3 produtos para um orçamento.
PRODUTOS:
1. Base de Ouro (Site/SEO)
2. Motor de Ouro (Vendedor AI)
3. Mapa de Ouro (Dashboard ROI)
REGRAS:
1. **Tom de Voz:** Consultor de vendas, prestativo.
2. **Foco:** Entenda quais produtos o lead quer e qual o objetivo dele.
3. **Se o usuário disse 'Sim' para o orçamento:** Comece perguntando quais produtos mais lhe interessaram (Base, Motor ou Mapa).
4. **Se o usuário respondeu quais produtos:** Pergunte qual o objetivo principal dele (Ex: \"Entendido. E qual seria o objetivo principal? Gerar mais leads? Automatizar o time?\").
5. **Se o usuário respondeu o objetivo:** Pergunte a faixa de orçamento (Ex: \"Perfeito. Para eu montar a melhor proposta, qual sua faixa de orçamento disponível? (Ex: R$ 600, R$ 2000, Acima de R$ 5000)\").
6. **Se o usuário deu o orçamento:** Agradeça e finalize. Use a tag {BUDGET_MARKER}."
    )
}

/// 后台完整报告：逐项讲解，不推销
pub fn final_report(name: &str, url: &str, score: f64, failing: &[AuditCheck]) -> String {
    format!(
        "Você é o \"Analista de Ouro\", um professor paciente de SEO técnico.
Escreva um relatório completo e didático para {name} sobre o site {url}.
Score SEO mobile: {score:.0}/100.
Falhas detectadas ({count}): {checks}
REGRAS:
1. Para CADA falha: explique o que ela significa, por que importa para o Google e para o visitante, e como corrigir passo a passo.
2. Ordene da falha mais grave para a menos grave.
3. Não ofereça produtos nem peça orçamento. O objetivo é apenas ensinar.
4. Termine com um resumo de prioridades em no máximo 5 itens.",
        checks = checks_json(failing),
        count = failing.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::{AnalysisStatus, LeadStatus};

    fn lead() -> Lead {
        Lead {
            id: "l1".to_string(),
            status: LeadStatus::CollectingData,
            url_analyzed: "https://example.com".to_string(),
            seo_score: Some(42.0),
            name: Some("Ana".to_string()),
            email: None,
            phone: None,
            role: None,
            report_text: None,
            conversation_log: Vec::new(),
            analysis_status: AnalysisStatus::Pending,
            final_report: None,
            email_notified: false,
            budget_collected_at: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_collecting_data_lists_only_missing_fields() {
        let text = collecting_data(&lead(), &[ContactField::Email, ContactField::Phone], "Ana");
        assert!(text.contains("email (email profissional)"));
        assert!(text.contains("whatsapp"));
        assert!(!text.contains("cargo"));
        assert!(text.contains("Perfeito, Ana."));
    }

    #[test]
    fn test_bait_report_requires_marker_and_embeds_checks() {
        let failing = vec![AuditCheck {
            title: "Image elements do not have [alt] attributes".to_string(),
            description: String::new(),
            score: 0.0,
        }];
        let text = bait_report(&lead(), 42.0, &failing);
        assert!(text.contains(REPORT_MARKER));
        assert!(text.contains("42/100"));
        assert!(text.contains("Analise as 1 falhas"));
        assert!(text.contains("[alt]"));
    }

    #[test]
    fn test_budget_and_final_report_markers() {
        assert!(budget().contains(BUDGET_MARKER));
        let text = final_report("Ana", "https://example.com", 87.4, &[]);
        assert!(text.contains("87/100"));
        assert!(!text.contains(REPORT_MARKER));
        assert!(!text.contains(BUDGET_MARKER));
    }
}
