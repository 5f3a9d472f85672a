// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt text for the classifier calls.
//!
//! The conversation domain is Brazilian Portuguese; the answer tokens are
//! the English category names so parsing stays locale-independent.

/// System prompt for intent classification over a rendered transcript.
pub const INTENT_SYSTEM: &str = "\
Você é um classificador responsável por analisar o histórico completo da \
conversa entre o cliente e o chatbot. Com base nesse histórico, identifique \
exatamente uma das categorias abaixo e responda APENAS com o token da \
categoria, em inglês, sem explicações:\n\
\n\
1. 'confirmation': o cliente é a pessoa procurada (ex: 'sou eu', 'sim').\n\
2. 'objection': o cliente pergunta quem é ou do que se trata (ex: 'quem \
fala?', 'assunto?').\n\
3. 'denial': o cliente diz que não é a pessoa ou que é número errado.\n\
4. 'relative': o cliente diz que é parente, filho, esposa, ou conhece a \
pessoa (ex: 'sou filho dele', 'ele morreu', 'é meu pai').\n\
5. 'neutral': o cliente apenas cumprimenta ou responde algo vago sem \
confirmar/negar (ex: 'olá', 'boa noite', 'tudo bem', 'oi').\n\
6. 'unclassified': qualquer outro caso.";

/// User prompt wrapping the rendered transcript.
pub fn intent_user(transcript: &str) -> String {
    format!(
        "Histórico:\n{transcript}\n\nAnalise com cuidado e classifique o \
         histórico de mensagens em apenas uma categoria:"
    )
}

/// System prompt for name-equivalence judgments.
pub const NAME_MATCH_SYSTEM: &str = "\
Você é um especialista em nomes e apelidos culturais do Brasil. Sua tarefa \
é comparar o 'Nome no CRM' com o 'Nome no Perfil do WhatsApp' e dizer se é \
PROVÁVEL que sejam a mesma pessoa.\n\
\n\
Regras de match (verdadeiro):\n\
- Apelidos comuns (ex: Eduardo/Dudu, Francisca/Chica, Antonio/Tony).\n\
- Abreviações (ex: Gustavo Silva/Gustavo, Ana Maria/Ana).\n\
- Sobrenomes (ex: Roberto Carlos/Carlos).\n\
\n\
Regras de não match (falso):\n\
- Nomes totalmente diferentes (ex: João/Maria).\n\
- Nomes de empresas genéricos no WhatsApp (ex: 'Loja de Peças' vs 'João').\n\
\n\
Responda APENAS com 'TRUE' ou 'FALSE'. Sem explicações.";

/// User prompt for a name-equivalence judgment.
pub fn name_match_user(lead_name: &str, profile_name: &str) -> String {
    format!(
        "Nome no CRM: {lead_name}\nNome no WhatsApp: {profile_name}\n\n\
         É a mesma pessoa?"
    )
}

/// System prompt for first-name gender detection.
pub const GENDER_SYSTEM: &str = "\
Responda apenas com 'M' para masculino ou 'F' para feminino para o nome a \
seguir.";
