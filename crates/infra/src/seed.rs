//! Random demo data.

use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

use roster_persons::{Centi, Cpf, PersonFields, Sex};

use crate::store::{PersonStore, StoreError};

const MALE_NAMES: &[&str] = &[
    "João", "Pedro", "Lucas", "Gabriel", "Rafael", "Miguel", "Arthur", "Heitor", "Bernardo", "Davi",
];
const FEMALE_NAMES: &[&str] = &[
    "Maria", "Ana", "Julia", "Beatriz", "Larissa", "Helena", "Alice", "Laura", "Manuela", "Sofia",
];
const SURNAMES: &[&str] = &[
    "Silva", "Santos", "Oliveira", "Souza", "Rodrigues", "Ferreira", "Alves", "Pereira", "Lima",
    "Gomes", "Costa", "Ribeiro", "Martins", "Carvalho", "Almeida",
];

/// Heights 1.50..=2.00 m, weights 50..=110 kg, ages 10..=90 years.
pub fn random_person<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> PersonFields {
    let sex = if rng.gen_bool(0.5) { Sex::Male } else { Sex::Female };
    let first = match sex {
        Sex::Male => MALE_NAMES,
        Sex::Female => FEMALE_NAMES,
    }
    .choose(rng)
    .copied()
    .unwrap_or("Alex");
    let last = SURNAMES.choose(rng).copied().unwrap_or("Silva");

    let age_days = rng.gen_range(10 * 365..=90 * 365);
    let date_of_birth = today.checked_sub_days(Days::new(age_days)).unwrap_or(today);

    PersonFields {
        name: format!("{first} {last}"),
        date_of_birth,
        cpf: random_cpf(rng),
        sex,
        height: Centi::from_hundredths(rng.gen_range(150..=200)),
        weight: Centi::from_hundredths(rng.gen_range(5_000..=11_000)),
    }
}

/// A random CPF with valid check digits.
pub fn random_cpf<R: Rng + ?Sized>(rng: &mut R) -> Cpf {
    loop {
        let mut base = [0u8; 9];
        for digit in &mut base {
            *digit = rng.gen_range(0..=9);
        }
        // Only repeated-digit bases are rejected; retry those.
        if let Some(cpf) = Cpf::from_base(base) {
            return cpf;
        }
    }
}

/// `count` random people. CPFs may collide; the store rejects repeats.
pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<PersonFields> {
    let today = Utc::now().date_naive();
    (0..count).map(|_| random_person(rng, today)).collect()
}

/// Insert `count` random people, regenerating on CPF collisions.
pub fn seed_store<S, R>(store: &S, count: usize, rng: &mut R) -> Result<usize, StoreError>
where
    S: PersonStore + ?Sized,
    R: Rng + ?Sized,
{
    let today = Utc::now().date_naive();
    let mut created = 0;
    let mut attempts = 0;
    while created < count && attempts < count * 10 {
        attempts += 1;
        match store.insert(random_person(rng, today)) {
            Ok(_) => created += 1,
            Err(StoreError::DuplicateCpf(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    info!(created, "seeded person store");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::store::InMemoryPersonStore;
    use roster_persons::{HEIGHT_RANGE, PersonInput, WEIGHT_RANGE};

    #[test]
    fn generated_people_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for person in generate(200, &mut rng) {
            assert!(HEIGHT_RANGE.contains(&person.height));
            assert!(WEIGHT_RANGE.contains(&person.weight));
            assert!(Cpf::parse(person.cpf.as_str()).is_ok());

            // Survives the same validation as API input.
            let input = PersonInput {
                name: Some(person.name.clone().into()),
                date_of_birth: Some(person.date_of_birth.to_string().into()),
                cpf: Some(person.cpf.formatted().into()),
                sex: Some(person.sex.code().into()),
                height: Some(person.height.to_string().as_str().into()),
                weight: Some(person.weight.to_string().as_str().into()),
            };
            assert_eq!(input.validate(), Ok(person));
        }
    }

    #[test]
    fn seeds_requested_count() {
        let store = InMemoryPersonStore::new();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(seed_store(&store, 25, &mut rng).unwrap(), 25);
        assert_eq!(store.list().unwrap().len(), 25);
    }
}
