use crate::infra::{build_citation_service, load_catalog, seed_citizens};
use chrono::Local;
use clap::Args;
use rapports::citations::{
    assess_draft, CatalogFilter, Caller, CitationDraft, CitationPreview, CitizenId,
    InfractionCatalog, InfractionId,
};
use rapports::config::CitationConfig;
use rapports::error::AppError;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct AmendesListArgs {
    /// Fine schedule CSV export (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Only list infractions of this category
    #[arg(long)]
    pub(crate) categorie: Option<String>,
    /// Case-insensitive substring of the infraction name
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PreviewArgs {
    /// Fine schedule CSV export (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Infraction identifier; repeat the flag to select several
    #[arg(long, required = true)]
    pub(crate) amende: Vec<u32>,
    /// Force repeat pricing on or off (`--recidive` alone means on); by default a
    /// non-empty history turns it on
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub(crate) recidive: Option<bool>,
    /// Infraction identifier already cited against the citizen
    #[arg(long)]
    pub(crate) historique: Vec<u32>,
    /// Operator text appended after the generated summary
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Fine schedule CSV export (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

pub(crate) fn run_amendes_list(args: AmendesListArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.csv.as_deref())?;
    let filter = CatalogFilter {
        categorie: args.categorie,
        search: args.search,
    };
    let definitions = catalog
        .list(&filter)
        .map_err(rapports::citations::CitationServiceError::from)?;

    println!("{} infraction(s)", definitions.len());
    for definition in definitions {
        println!(
            "- [{}] {} ({}) | amende {} | récidive {} | points {} | prison {}",
            definition.id,
            definition.infraction,
            definition.categorie,
            definition.montant,
            definition.recidive,
            definition.retrait_points,
            definition.prison
        );
    }
    Ok(())
}

pub(crate) fn run_rapport_preview(args: PreviewArgs) -> Result<(), AppError> {
    let preview = preview_offline(args)?;
    render_preview(&preview);
    Ok(())
}

fn preview_offline(args: PreviewArgs) -> Result<CitationPreview, AppError> {
    let catalog = load_catalog(args.csv.as_deref())?;
    let history: BTreeSet<InfractionId> = args.historique.into_iter().map(InfractionId).collect();
    let draft = CitationDraft {
        amende_ids: args.amende.into_iter().map(InfractionId).collect(),
        description: args.description.unwrap_or_default(),
        est_recidive: args.recidive,
        ..CitationDraft::default()
    };
    Ok(assess_draft(
        &catalog,
        &draft,
        &history,
        CitationConfig::default().history_defaults_recidive,
    )?)
}

fn render_preview(preview: &CitationPreview) {
    println!(
        "Récidive: {}",
        if preview.est_recidive { "oui" } else { "non" }
    );
    println!(
        "Montant appliqué: {}",
        preview.montant_applique.as_deref().unwrap_or("aucun")
    );
    println!("\n{}", preview.description);
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.csv.as_deref())?;
    let (service, _, citizens) = build_citation_service(catalog, CitationConfig::default());
    seed_citizens(&citizens).map_err(rapports::citations::CitationServiceError::from)?;

    let agent = Caller::agent(7);
    let admin = Caller::admin(1);
    let citizen = CitizenId(1);
    let draft = |ids: &[u32], description: &str| CitationDraft {
        citoyen_id: Some(citizen),
        citoyen_nom: "DURAND".to_string(),
        citoyen_prenom: "Alice".to_string(),
        amende_ids: ids.iter().copied().map(InfractionId).collect(),
        description: description.to_string(),
        lieu: Some("Avenue de la Gare".to_string()),
        est_recidive: None,
    };

    println!("Citation demo");
    let first = service.record(&agent, draft(&[1, 3], "Contrôle de vitesse"))?;
    println!(
        "\n#{} enregistré par l'agent {} ({})",
        first.citation.id,
        agent.id,
        first.citation.montant_applique.as_deref().unwrap_or("aucun montant")
    );
    println!("{}", first.citation.description);

    let history = service.history(&rapports::citations::CitizenKey::Id(citizen))?;
    println!(
        "\nHistorique: {} infraction(s) connue(s), récidive suggérée: {}",
        history.infractions.len(),
        history.suggest_recidive
    );

    let second = service.record(&agent, draft(&[1], ""))?;
    println!(
        "\n#{} enregistré en récidive: {} ({})",
        second.citation.id,
        second.citation.est_recidive,
        second.citation.montant_applique.as_deref().unwrap_or("aucun montant")
    );

    let paid = service.set_status(&agent, first.citation.id, "Payé")?;
    println!("\n#{} passe au statut {}", paid.id, paid.statut);
    if let Err(err) = service.set_status(&Caller::agent(8), second.citation.id, "Rejeté") {
        println!("Changement refusé: {err}");
    }

    let record = service.casier(citizen)?;
    println!(
        "\nCasier de {} {}: {} rapport(s), {}$ d'amendes, {} en cours, {} payé(s)",
        record.citizen.prenom,
        record.citizen.nom,
        record.stats.total_rapports,
        record.stats.total_amendes,
        record.stats.rapports_en_cours,
        record.stats.rapports_payes
    );

    if let Err(err) = service.delete_citizen(&admin, citizen) {
        println!("Suppression refusée: {err}");
    }

    let overview = service.overview(&agent, Local::now().date_naive())?;
    println!(
        "\nVue d'ensemble: {} rapport(s), {} ce mois-ci, {} pour l'agent {}",
        overview.total_rapports, overview.rapports_mois, overview.mes_rapports, agent.id
    );

    Ok(())
}
