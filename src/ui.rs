//! Interface de terminal do autoapply — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`RunProgress`] acompanha visualmente
//! a fila de alvos no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::flow::{Target, TargetReport, TargetState};
use crate::queue::RunSummary;

/// Indicador visual de progresso para a fila de alvos no terminal.
///
/// Exibe um spinner animado enquanto um alvo está em andamento e mensagens
/// coloridas para envio (verde), pulo (amarelo) e falha (vermelho).
pub struct RunProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de envio concluído.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para pulos e avisos.
    yellow: Style,
}

impl RunProgress {
    /// Inicia o spinner e retorna a instância de progresso.
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner para o alvo atual.
    pub fn target_started(&self, index: usize, total: usize, target: &Target) {
        let label = target.title.as_deref().unwrap_or(&target.url);
        self.pb.set_message(format!("[{index}/{total}] {label}"));
    }

    /// Exibe o veredito de um alvo concluído.
    ///
    /// Envio é mostrado em verde com checkmark; falha em vermelho com X.
    pub fn target_finished(&self, report: &TargetReport) {
        let line = match report.state {
            TargetState::Submitted => format!(
                "  {} Submitted after {} cycle(s)",
                self.green.apply_to("✓"),
                report.cycles
            ),
            TargetState::Skipped => format!(
                "  {} Skipped: {}",
                self.yellow.apply_to("→"),
                report.reason.as_deref().unwrap_or("no reason recorded")
            ),
            _ => format!(
                "  {} Failed: {}",
                self.red.apply_to("✗"),
                report.reason.as_deref().unwrap_or("no reason recorded")
            ),
        };
        self.pb.println(line);
    }

    /// Finaliza o spinner e imprime o resumo da execução formatado em JSON.
    pub fn print_summary(&self, summary: &RunSummary) {
        self.pb.finish_and_clear();
        let style = if summary.failed > 0 {
            &self.red
        } else if summary.skipped > 0 {
            &self.yellow
        } else {
            &self.green
        };
        println!();
        println!("{}", style.apply_to("─── Run Summary ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
    }
}
