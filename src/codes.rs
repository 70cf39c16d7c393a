//! Code dictionaries for display labels

use crate::types::{columns, Candidate, DisplayLabels};

const AREAS: &[(i64, &str)] = &[
    (1, "Administração e Negócios"),
    (2, "Gestão de Projetos"),
    (3, "Finanças"),
    (4, "Recursos Humanos"),
    (5, "Operações e Processos"),
    (6, "Jurídico"),
    (7, "Comércio e Varejo"),
    (8, "Vendas"),
    (9, "Atendimento ao Cliente"),
    (13, "Marketing"),
    (14, "Design"),
    (15, "Comunicação"),
    (16, "Criação de conteúdo"),
    (17, "Criação e Conteúdo"),
    (20, "Cultura e Entretenimento"),
    (21, "Educação"),
    (26, "Tecnologia"),
    (27, "Pesquisa e Inovação"),
    (28, "Infraestrutura e Telecomunicações"),
    (32, "Construção e Imobiliário"),
    (33, "Engenharia"),
    (34, "Indústria"),
    (37, "Energia"),
    (38, "Logística"),
    (39, "Transporte e Mobilidade"),
    (45, "Meio Ambiente"),
    (48, "Agronegócio"),
    (60, "Saúde"),
    (63, "Esportes e Bem-estar"),
    (70, "Segurança e Defesa"),
];

const AREA_CLUSTERS: &[(&str, &[i64])] = &[
    ("Negócios", &[1, 2, 3, 4, 5, 6, 7, 8, 9]),
    ("Criativo", &[13, 14, 15, 16, 17, 20, 21]),
    ("Tecnologia", &[26, 27, 28]),
    ("Engenharia", &[32, 33, 34]),
    ("Infraestrutura", &[37, 38, 39]),
    ("Agronegócio", &[45, 48]),
    ("Saúde", &[60, 63]),
    ("Segurança", &[70]),
];

const EDUCATION_LEVELS: [&str; 15] = [
    "Sem formação acadêmica",
    "Ensino Fundamental Incompleto",
    "Ensino Fundamental Completo",
    "Ensino Médio Incompleto",
    "Ensino Médio Completo",
    "Técnico Incompleto",
    "Técnico Completo",
    "Superior Incompleto",
    "Superior Completo",
    "Pós-Graduação Incompleta",
    "Pós-Graduação Completa",
    "Mestrado Incompleto",
    "Mestrado Completo",
    "Doutorado Incompleto",
    "Doutorado Completo",
];

const ROLE_LEVELS: [&str; 9] = [
    "Primeiro emprego",
    "Estagiário",
    "Assistente",
    "Analista",
    "Supervisor",
    "Coordenador",
    "Gerente",
    "Diretor",
    "Autônomo",
];

const AGE_BRACKETS: [&str; 11] = [
    "18-19 anos",
    "20-24 anos",
    "25-29 anos",
    "30-34 anos",
    "35-39 anos",
    "40-44 anos",
    "45-49 anos",
    "50-54 anos",
    "55-59 anos",
    "60-64 anos",
    "65+ anos",
];

const REGIMES: [&str; 4] = ["Híbrido", "Presencial", "Remoto", "Indiferente"];

/// Integral codes only; imputed values are always whole numbers
fn as_code(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn indexed(table: &'static [&'static str], value: f64) -> Option<&'static str> {
    let code = usize::try_from(as_code(value)?).ok()?;
    table.get(code).copied()
}

pub fn area_label(value: f64) -> Option<&'static str> {
    let code = as_code(value)?;
    AREAS.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

pub fn area_cluster(value: f64) -> Option<&'static str> {
    let code = as_code(value)?;
    AREA_CLUSTERS
        .iter()
        .find(|(_, members)| members.contains(&code))
        .map(|(name, _)| *name)
}

pub fn education_label(value: f64) -> Option<&'static str> {
    indexed(&EDUCATION_LEVELS, value)
}

pub fn role_label(value: f64) -> Option<&'static str> {
    indexed(&ROLE_LEVELS, value)
}

pub fn age_bracket_label(value: f64) -> Option<&'static str> {
    indexed(&AGE_BRACKETS, value)
}

pub fn regime_label(value: f64) -> Option<&'static str> {
    indexed(&REGIMES, value)
}

/// Labels for a ranked row. Passthrough text fields win over dictionary lookups.
pub fn display_labels(candidate: &Candidate) -> DisplayLabels {
    let attrs = &candidate.attributes;
    let passthrough = |column: &str| candidate.display.get(column).cloned();
    DisplayLabels {
        area: passthrough(columns::AREA_LABEL)
            .or_else(|| area_label(attrs.area).map(str::to_string)),
        area_cluster: area_cluster(attrs.area).map(str::to_string),
        role: passthrough(columns::ROLE_LABEL)
            .or_else(|| role_label(attrs.role_level).map(str::to_string)),
        education: passthrough(columns::EDUCATION_LABEL)
            .or_else(|| education_label(attrs.education_level).map(str::to_string)),
        age_bracket: age_bracket_label(attrs.age_bracket).map(str::to_string),
        regime: regime_label(attrs.regime).map(str::to_string),
    }
}
