use std::collections::BTreeMap;

use super::{
    BehaviorProfile, CatalogData, Disorder, ScoreBand, TestDefinition, TreatmentDefinition,
    TreatmentIndication,
};
use crate::simulation::domain::{DisorderId, LifeAspect, SymptomId, TestId, TreatmentId};

pub(super) fn standard_catalog() -> CatalogData {
    CatalogData {
        disorders: disorders(),
        treatments: treatments(),
        tests: tests(),
        behaviors: behaviors(),
    }
}

fn disorder(id: &str, name: &str, category: &str, criteria_count: u8, symptoms: &[&str]) -> Disorder {
    Disorder {
        id: DisorderId::from(id),
        name: name.to_string(),
        category: category.to_string(),
        criteria_count,
        symptoms: symptoms.iter().map(|s| SymptomId::from(*s)).collect(),
    }
}

fn disorders() -> Vec<Disorder> {
    vec![
        disorder(
            "depresion_mayor",
            "Trastorno depresivo mayor",
            "estado_de_animo",
            5,
            &[
                "tristeza",
                "anhedonia",
                "fatiga",
                "insomnio",
                "culpa",
                "dificultad_concentracion",
                "cambios_apetito",
                "enlentecimiento",
                "ideacion_suicida",
            ],
        ),
        disorder(
            "distimia",
            "Trastorno depresivo persistente",
            "estado_de_animo",
            3,
            &[
                "tristeza",
                "fatiga",
                "baja_autoestima",
                "desesperanza",
                "cambios_apetito",
                "insomnio",
            ],
        ),
        disorder(
            "ansiedad_generalizada",
            "Trastorno de ansiedad generalizada",
            "ansiedad",
            3,
            &[
                "preocupacion_excesiva",
                "inquietud",
                "fatiga",
                "irritabilidad",
                "tension_muscular",
                "insomnio",
                "dificultad_concentracion",
            ],
        ),
        disorder(
            "trastorno_panico",
            "Trastorno de pánico",
            "ansiedad",
            4,
            &[
                "palpitaciones",
                "sudoracion",
                "temblores",
                "falta_de_aire",
                "miedo_a_morir",
                "preocupacion_por_ataques",
                "evitacion",
            ],
        ),
        disorder(
            "tept",
            "Trastorno de estrés postraumático",
            "trauma",
            4,
            &[
                "recuerdos_intrusivos",
                "pesadillas",
                "evitacion",
                "hipervigilancia",
                "irritabilidad",
                "insomnio",
                "culpa",
            ],
        ),
        disorder(
            "insomnio_cronico",
            "Trastorno de insomnio",
            "sueno",
            2,
            &["insomnio", "fatiga", "irritabilidad", "dificultad_concentracion"],
        ),
    ]
}

fn indication(disorder: &str, first_line: bool) -> TreatmentIndication {
    TreatmentIndication {
        disorder: DisorderId::from(disorder),
        first_line,
    }
}

fn treatment(id: &str, name: &str, indications: Vec<TreatmentIndication>) -> TreatmentDefinition {
    TreatmentDefinition {
        id: TreatmentId::from(id),
        name: name.to_string(),
        indications,
    }
}

fn treatments() -> Vec<TreatmentDefinition> {
    vec![
        treatment(
            "tcc",
            "Terapia cognitivo-conductual",
            vec![
                indication("depresion_mayor", true),
                indication("ansiedad_generalizada", true),
                indication("trastorno_panico", true),
                indication("distimia", false),
                indication("insomnio_cronico", false),
            ],
        ),
        treatment(
            "isrs",
            "Inhibidores selectivos de la recaptación de serotonina",
            vec![
                indication("distimia", true),
                indication("depresion_mayor", false),
                indication("ansiedad_generalizada", false),
                indication("trastorno_panico", false),
                indication("tept", false),
            ],
        ),
        treatment(
            "activacion_conductual",
            "Activación conductual",
            vec![
                indication("depresion_mayor", false),
                indication("distimia", false),
            ],
        ),
        treatment(
            "exposicion_prolongada",
            "Terapia de exposición prolongada",
            vec![indication("tept", true), indication("trastorno_panico", false)],
        ),
        treatment("emdr", "EMDR", vec![indication("tept", false)]),
        treatment(
            "tcc_insomnio",
            "TCC para el insomnio",
            vec![indication("insomnio_cronico", true)],
        ),
        treatment(
            "relajacion",
            "Entrenamiento en relajación",
            vec![
                indication("ansiedad_generalizada", false),
                indication("insomnio_cronico", false),
            ],
        ),
        treatment("hipnosis", "Hipnosis clínica", Vec::new()),
    ]
}

fn band(min: u16, max: u16, interpretation: &str) -> ScoreBand {
    ScoreBand {
        min,
        max,
        interpretation: interpretation.to_string(),
    }
}

fn tests() -> Vec<TestDefinition> {
    vec![
        TestDefinition {
            id: TestId::from("bdi_ii"),
            name: "Inventario de Depresión de Beck (BDI-II)".to_string(),
            targets: vec![DisorderId::from("depresion_mayor"), DisorderId::from("distimia")],
            bands: vec![
                band(0, 13, "mínima"),
                band(14, 19, "leve"),
                band(20, 28, "moderada"),
                band(29, 63, "grave"),
            ],
        },
        TestDefinition {
            id: TestId::from("gad_7"),
            name: "Escala de Ansiedad Generalizada (GAD-7)".to_string(),
            targets: vec![
                DisorderId::from("ansiedad_generalizada"),
                DisorderId::from("trastorno_panico"),
            ],
            bands: vec![
                band(0, 4, "mínima"),
                band(5, 9, "leve"),
                band(10, 14, "moderada"),
                band(15, 21, "grave"),
            ],
        },
        TestDefinition {
            id: TestId::from("pcl_5"),
            name: "Lista de chequeo de TEPT (PCL-5)".to_string(),
            targets: vec![DisorderId::from("tept")],
            bands: vec![band(0, 32, "por debajo del umbral"), band(33, 80, "TEPT probable")],
        },
        TestDefinition {
            id: TestId::from("isi"),
            name: "Índice de Gravedad del Insomnio (ISI)".to_string(),
            targets: vec![DisorderId::from("insomnio_cronico")],
            bands: vec![
                band(0, 7, "sin insomnio clínico"),
                band(8, 14, "subumbral"),
                band(15, 21, "moderado"),
                band(22, 28, "grave"),
            ],
        },
    ]
}

fn behavior(disorder: &str, general: &[&str], aspects: &[(LifeAspect, &str)]) -> BehaviorProfile {
    BehaviorProfile {
        disorder: DisorderId::from(disorder),
        general_lines: general.iter().map(|line| line.to_string()).collect(),
        aspect_lines: aspects
            .iter()
            .map(|(aspect, line)| (*aspect, line.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn behaviors() -> Vec<BehaviorProfile> {
    vec![
        behavior(
            "depresion_mayor",
            &[
                "Últimamente nada me hace ilusión, ni siquiera lo que antes me gustaba.",
                "Me cuesta mucho levantarme; todo me parece un esfuerzo enorme.",
                "Siento que le fallo a todo el mundo.",
            ],
            &[
                (LifeAspect::Family, "Mi familia dice que estoy distinta, pero no sé explicarles qué me pasa."),
                (LifeAspect::Work, "En el trabajo me cuesta concentrarme y ya me han llamado la atención."),
                (LifeAspect::Sleep, "Me despierto a las cuatro de la mañana y ya no me vuelvo a dormir."),
                (LifeAspect::Leisure, "Dejé de pintar, ya no le encuentro sentido."),
            ],
        ),
        behavior(
            "distimia",
            &[
                "La verdad es que siempre he sido así, un poco apagada.",
                "No es que esté fatal, pero hace años que no me siento bien del todo.",
            ],
            &[
                (LifeAspect::Childhood, "De pequeña ya decían que era una niña muy seria."),
                (LifeAspect::Social, "Tengo pocos amigos; me canso de quedar."),
            ],
        ),
        behavior(
            "ansiedad_generalizada",
            &[
                "Me preocupo por todo, aunque sé que muchas cosas no van a pasar.",
                "Tengo la cabeza siempre dando vueltas y los hombros muy tensos.",
            ],
            &[
                (LifeAspect::Work, "Reviso los correos del trabajo diez veces por miedo a equivocarme."),
                (LifeAspect::Finances, "Aunque no vamos mal, pienso constantemente en que nos faltará dinero."),
                (LifeAspect::Sleep, "Me cuesta dormirme porque repaso todo lo que puede salir mal."),
            ],
        ),
        behavior(
            "trastorno_panico",
            &[
                "De repente el corazón se me dispara y siento que me voy a morir.",
                "Ya no cojo el metro por si me vuelve a dar uno de esos ataques.",
            ],
            &[
                (LifeAspect::Health, "Fui a urgencias convencido de que era un infarto y me dijeron que estaba sano."),
                (LifeAspect::Social, "Evito los sitios con mucha gente."),
            ],
        ),
        behavior(
            "tept",
            &[
                "Hay imágenes que me vienen a la cabeza aunque no quiera.",
                "Cualquier ruido fuerte me pone en alerta.",
            ],
            &[
                (LifeAspect::Sleep, "Tengo pesadillas casi todas las noches."),
                (LifeAspect::Partner, "Mi pareja dice que estoy siempre a la defensiva."),
                (LifeAspect::Substances, "A veces bebo para poder dormir."),
            ],
        ),
        behavior(
            "insomnio_cronico",
            &[
                "Estoy agotado, llevo meses durmiendo fatal.",
                "Por la tarde estoy irritable y no rindo nada.",
            ],
            &[
                (LifeAspect::Sleep, "Me acuesto a las once y a las dos sigo mirando el techo."),
                (LifeAspect::Substances, "Tomo cuatro o cinco cafés al día para aguantar."),
            ],
        ),
    ]
}
