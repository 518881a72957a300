//! Instruction text for resolving a name the engine could not match.

/// Reference normalizations shown to the resolver.
pub const RESOLUTION_EXAMPLES: [(&str, &str); 6] = [
    ("HMG COMPLETO", "Hemograma completo"),
    ("RX TORAX PA", "Radiografia de tórax (PA e perfil)"),
    ("USG ABD TOTAL", "Ultrassonografia de abdome total"),
    ("ECG REPOUSO", "Eletrocardiograma em repouso"),
    ("T4 LIVRE", "Tiroxina livre (T4 livre)"),
    ("GAMA GT", "Gama-glutamiltransferase (GGT)"),
];

/// Build the resolution prompt for `original_name`.
///
/// The resolver (a language model or an operator) is expected to answer
/// with the standardized name only.
pub fn resolution_prompt(original_name: &str, score: f64, llm_threshold: f64) -> String {
    let mut prompt = format!(
        "Normalize o seguinte nome de exame médico para o padrão TUSS \
         (Terminologia Unificada da Saúde Suplementar da ANS).\n\
         Retorne APENAS o nome padronizado, sem explicações.\n\
         \n\
         Nome original: \"{original_name}\"\n\
         Confiança do match automático: {score:.1}% (abaixo do threshold de {llm_threshold}%)\n\
         \n\
         Contexto: Este é um exame de um portal hospitalar brasileiro.\n\
         \n\
         Exemplos de normalização:\n"
    );
    for (raw, standard) in RESOLUTION_EXAMPLES {
        prompt.push_str(&format!("- \"{raw}\" → \"{standard}\"\n"));
    }
    prompt.push_str("\nNome padronizado:");
    prompt
}
