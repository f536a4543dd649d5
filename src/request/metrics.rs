use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    ModelGraded,
    Statistical,
}

impl MetricGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelGraded => "model_graded",
            Self::Statistical => "statistical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub group: MetricGroup,
}

pub const METRIC_CATALOG: &[MetricDefinition] = &[
    MetricDefinition {
        name: "gpt_groundedness",
        display_name: "Groundedness",
        description: "Groundedness assesses the correspondence between claims in an AI-generated answer and the source context, making sure that these claims are substantiated by the context.",
        group: MetricGroup::ModelGraded,
    },
    MetricDefinition {
        name: "gpt_relevance",
        display_name: "Relevance",
        description: "Relevance assesses the ability of answers to capture the key points of the context.",
        group: MetricGroup::ModelGraded,
    },
    MetricDefinition {
        name: "gpt_coherence",
        display_name: "Coherence",
        description: "Coherence measures how well the language model can produce output that flows smoothly, reads naturally, and resembles human-like language.",
        group: MetricGroup::ModelGraded,
    },
    MetricDefinition {
        name: "gpt_similarity",
        display_name: "Similarity",
        description: "Similarity measures the similarity between a source data (ground truth) sentence and the generated response by an AI model.",
        group: MetricGroup::ModelGraded,
    },
    MetricDefinition {
        name: "gpt_fluency",
        display_name: "Fluency",
        description: "Fluency measures the grammatical proficiency of a generative AI's predicted answer.",
        group: MetricGroup::ModelGraded,
    },
    MetricDefinition {
        name: "f1_score",
        display_name: "F1 Score",
        description: "F1 score measures the ratio of the number of shared words between the model generation and the ground truth answers.",
        group: MetricGroup::Statistical,
    },
    MetricDefinition {
        name: "answer_length",
        display_name: "Answer Length",
        description: "The length of the generated answer, in characters.",
        group: MetricGroup::Statistical,
    },
    MetricDefinition {
        name: "latency",
        display_name: "Latency",
        description: "The time it takes for the chat app to generate an answer, in seconds.",
        group: MetricGroup::Statistical,
    },
];

pub fn find_metric(name: &str) -> Option<&'static MetricDefinition> {
    METRIC_CATALOG.iter().find(|metric| metric.name == name)
}

pub fn metric_names(group: MetricGroup) -> Vec<String> {
    METRIC_CATALOG
        .iter()
        .filter(|metric| metric.group == group)
        .map(|metric| metric.name.to_string())
        .collect()
}
