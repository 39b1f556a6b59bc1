use crate::models::{Doctor, DoctorQuery, ImagingCenter, ImagingModality, Nurse, Specialty};

/// Doctors within this distance count as "nearby".
pub const NEARBY_RADIUS_KM: f64 = 5.0;

/// Static reference data the booking flow picks from.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub centers: Vec<ImagingCenter>,
    pub tests: Vec<String>,
    pub doctors: Vec<Doctor>,
    pub nurses: Vec<Nurse>,
}

impl Catalog {
    pub fn new(
        centers: Vec<ImagingCenter>,
        tests: Vec<String>,
        doctors: Vec<Doctor>,
        nurses: Vec<Nurse>,
    ) -> Self {
        Self { centers, tests, doctors, nurses }
    }

    /// The clinic's published centers, lab panels, doctors and nurses.
    pub fn standard() -> Self {
        let centers = vec![
            center(
                "center-1",
                "Centre d'Imagerie Médicale Pasteur",
                "25 Rue des Médecins, 75001 Paris",
                2.3,
                4.6,
                &[ImagingModality::Irm, ImagingModality::Scanner, ImagingModality::Radio],
            ),
            center(
                "center-2",
                "Imagerie Médicale Saint-Louis",
                "42 Avenue des Spécialistes, 75002 Paris",
                3.5,
                4.8,
                &[ImagingModality::Irm, ImagingModality::Scanner],
            ),
            center(
                "center-3",
                "Centre de Radiologie Moderne",
                "18 Boulevard de la Santé, 75003 Paris",
                1.8,
                4.5,
                &[ImagingModality::Scanner, ImagingModality::Radio],
            ),
        ];

        let tests = [
            "Numération Formule Sanguine",
            "Bilan Métabolique de Base",
            "Bilan Métabolique Complet",
            "Bilan Lipidique",
            "Bilan Thyroïdien",
            "Hémoglobine A1c",
            "Vitamine D",
            "Test COVID-19",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        let doctors = vec![
            doctor("doc-1", "Dr. Sophie Moreau", Specialty::General, 4.9, 2.5, 25.0, true, "12 Rue de Rivoli, 75004 Paris"),
            doctor("doc-2", "Dr. Pierre Lambert", Specialty::Cardiology, 4.8, 3.2, 45.0, false, "8 Rue du Cœur, 75010 Paris"),
            doctor("doc-3", "Dr. Anne Dubois", Specialty::Dermatology, 4.7, 1.8, 35.0, true, "31 Rue de la Peau, 75006 Paris"),
            doctor("doc-4", "Dr. François Martin", Specialty::Pediatrics, 4.9, 4.1, 40.0, true, "5 Place des Enfants, 75011 Paris"),
            doctor("doc-5", "Dr. Julie Blanc", Specialty::Psychology, 4.8, 2.7, 50.0, false, "17 Avenue Sereine, 75007 Paris"),
        ];

        let nurses = vec![
            nurse("nurse-1", "Marie Dupont", 1.2, 4.8, &["Prélèvement sanguin", "Soins à domicile"]),
            nurse("nurse-2", "Jean Martin", 2.4, 4.7, &["Prélèvement sanguin", "Injection"]),
            nurse(
                "nurse-3",
                "Sarah Lemoine",
                3.1,
                4.9,
                &["Prélèvement sanguin", "Soins à domicile", "Soins pédiatriques"],
            ),
        ];

        Self { centers, tests, doctors, nurses }
    }

    /// Centers offering `modality`, or all of them when none is given.
    pub fn centers_for(&self, modality: Option<ImagingModality>) -> Vec<&ImagingCenter> {
        self.centers
            .iter()
            .filter(|c| modality.map_or(true, |m| c.offers(m)))
            .collect()
    }

    pub fn filter_doctors(&self, query: &DoctorQuery) -> Vec<&Doctor> {
        let needle = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        self.doctors
            .iter()
            .filter(|d| needle.as_ref().map_or(true, |n| d.name.to_lowercase().contains(n)))
            .filter(|d| query.specialty.map_or(true, |s| d.specialty == s))
            .filter(|d| !query.nearby_only || d.distance_km <= NEARBY_RADIUS_KM)
            .collect()
    }

    pub fn find_center(&self, id: &str) -> Option<&ImagingCenter> {
        self.centers.iter().find(|c| c.id == id)
    }

    pub fn find_doctor(&self, id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    pub fn find_nurse(&self, id: &str) -> Option<&Nurse> {
        self.nurses.iter().find(|n| n.id == id)
    }

    pub fn has_test(&self, test_type: &str) -> bool {
        self.tests.iter().any(|t| t == test_type)
    }

    pub fn default_test(&self) -> Option<&str> {
        self.tests.first().map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn center(
    id: &str,
    name: &str,
    address: &str,
    distance_km: f64,
    rating: f64,
    services: &[ImagingModality],
) -> ImagingCenter {
    ImagingCenter {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        distance_km,
        rating,
        available_services: services.to_vec(),
    }
}

#[allow(clippy::too_many_arguments)]
fn doctor(
    id: &str,
    name: &str,
    specialty: Specialty,
    rating: f64,
    distance_km: f64,
    price: f64,
    available: bool,
    practice_address: &str,
) -> Doctor {
    Doctor {
        id: id.to_string(),
        name: name.to_string(),
        specialty,
        rating,
        distance_km,
        price,
        available,
        practice_address: practice_address.to_string(),
    }
}

fn nurse(id: &str, name: &str, distance_km: f64, rating: f64, specialties: &[&str]) -> Nurse {
    Nurse {
        id: id.to_string(),
        name: name.to_string(),
        distance_km,
        rating,
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
    }
}
