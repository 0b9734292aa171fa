use std::io::Read;

use super::super::domain::{InfractionDefinition, InfractionId};
use super::super::penalty::NOT_APPLICABLE;
use super::normalizer::{
    category_for, cell_or, flag, NO_DETENTION, NO_FLAG, NO_POINTS, UNDEFINED_AMOUNT,
};

// Column positions in the fine schedule export.
const INFRACTION: usize = 1;
const MONTANT: usize = 3;
const RECIDIVE: usize = 4;
const RETRAIT_POINTS: usize = 6;
const PRISON: usize = 8;
const IMMOBILISATION: usize = 10;
const FOURRIERE: usize = 11;

const HEADER_MARKER: &str = "Infraction";
const MIN_NAME_LEN: usize = 3;

/// Read the headerless fine schedule export, assigning identifiers from 1.
pub(crate) fn parse_definitions<R: Read>(
    reader: R,
) -> Result<Vec<InfractionDefinition>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut definitions = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let infraction = match record.get(INFRACTION).map(str::trim) {
            Some(name) if !name.is_empty() && !name.contains(HEADER_MARKER) => name,
            _ => continue,
        };
        if infraction.chars().count() < MIN_NAME_LEN {
            continue;
        }

        let id = InfractionId(definitions.len() as u32 + 1);
        definitions.push(InfractionDefinition {
            id,
            infraction: infraction.to_string(),
            categorie: category_for(infraction).to_string(),
            montant: cell_or(record.get(MONTANT), UNDEFINED_AMOUNT),
            recidive: cell_or(record.get(RECIDIVE), NOT_APPLICABLE),
            retrait_points: cell_or(record.get(RETRAIT_POINTS), NO_POINTS),
            prison: cell_or(record.get(PRISON), NO_DETENTION),
            immobilisation: flag(&cell_or(record.get(IMMOBILISATION), NO_FLAG)),
            fourriere: flag(&cell_or(record.get(FOURRIERE), NO_FLAG)),
        });
    }

    Ok(definitions)
}
