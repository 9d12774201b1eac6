//! Lifestyle self-assessment scoring.
//!
//! Each of the six answers is worth 0 to 3 points. The score is the share of
//! the 18 available points, scaled to 0-100 and rounded.

use serde::{Deserialize, Serialize};

const MAX_POINTS: u32 = 18;

/// Four-step quality rating used for overall health and diet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Rating {
    fn points(self) -> u32 {
        match self {
            Rating::Excellent => 3,
            Rating::Good => 2,
            Rating::Fair => 1,
            Rating::Poor => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepHours {
    #[serde(rename = "less_than_5")]
    LessThan5,
    #[serde(rename = "5_6")]
    FiveToSix,
    #[serde(rename = "7_8")]
    SevenToEight,
    #[serde(rename = "more_than_8")]
    MoreThan8,
}

impl SleepHours {
    fn points(self) -> u32 {
        match self {
            SleepHours::SevenToEight => 3,
            SleepHours::MoreThan8 => 2,
            SleepHours::FiveToSix => 1,
            SleepHours::LessThan5 => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseFrequency {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "3_4_week")]
    ThreeToFourWeekly,
    #[serde(rename = "1_2_week")]
    OneToTwoWeekly,
    #[serde(rename = "rarely")]
    Rarely,
}

impl ExerciseFrequency {
    fn points(self) -> u32 {
        match self {
            ExerciseFrequency::Daily => 3,
            ExerciseFrequency::ThreeToFourWeekly => 2,
            ExerciseFrequency::OneToTwoWeekly => 1,
            ExerciseFrequency::Rarely => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl StressLevel {
    fn points(self) -> u32 {
        match self {
            StressLevel::Low => 3,
            StressLevel::Moderate => 2,
            StressLevel::High => 1,
            StressLevel::VeryHigh => 0,
        }
    }
}

/// Glasses of water per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterIntake {
    #[serde(rename = "more_than_8")]
    MoreThan8,
    #[serde(rename = "6_8")]
    SixToEight,
    #[serde(rename = "4_5")]
    FourToFive,
    #[serde(rename = "less_than_4")]
    LessThan4,
}

impl WaterIntake {
    fn points(self) -> u32 {
        match self {
            WaterIntake::MoreThan8 => 3,
            WaterIntake::SixToEight => 2,
            WaterIntake::FourToFive => 1,
            WaterIntake::LessThan4 => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentAnswers {
    pub overall_health: Rating,
    pub sleep_hours: SleepHours,
    pub exercise_frequency: ExerciseFrequency,
    pub stress_level: StressLevel,
    pub diet_quality: Rating,
    pub water_intake: WaterIntake,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssessmentResult {
    pub health_score: u8,
    pub feedback: String,
    pub tips: Vec<String>,
}

impl AssessmentAnswers {
    fn points(&self) -> u32 {
        self.overall_health.points()
            + self.sleep_hours.points()
            + self.exercise_frequency.points()
            + self.stress_level.points()
            + self.diet_quality.points()
            + self.water_intake.points()
    }

    pub fn health_score(&self) -> u8 {
        // Round half up in integer arithmetic
        ((self.points() * 200 + MAX_POINTS) / (MAX_POINTS * 2)) as u8
    }

    pub fn evaluate(&self) -> AssessmentResult {
        let health_score = self.health_score();
        AssessmentResult {
            health_score,
            feedback: feedback_for(health_score).to_string(),
            tips: self.tips(),
        }
    }

    fn tips(&self) -> Vec<String> {
        let mut tips = Vec::new();

        if self.overall_health.points() < 2 {
            tips.push(
                "Schedule a routine check-up with your doctor to review how you have been feeling."
                    .to_string(),
            );
        }
        if self.sleep_hours.points() < 2 {
            tips.push(
                "Aim for 7-8 hours of sleep: keep a regular bedtime and avoid screens an hour before bed."
                    .to_string(),
            );
        }
        if self.exercise_frequency.points() < 2 {
            tips.push(
                "Build up to at least 150 minutes of moderate activity a week, such as brisk walking."
                    .to_string(),
            );
        }
        if self.stress_level.points() < 2 {
            tips.push(
                "Set aside time daily for relaxation: deep breathing, meditation or a short walk."
                    .to_string(),
            );
        }
        if self.diet_quality.points() < 2 {
            tips.push(
                "Add more vegetables, fruit and whole grains, and cut back on processed food and sugar."
                    .to_string(),
            );
        }
        if self.water_intake.points() < 2 {
            tips.push("Drink at least 8 glasses of water a day; keep a bottle within reach.".to_string());
        }

        if tips.is_empty() {
            tips.push(
                "Keep up your healthy habits and continue with regular preventive check-ups."
                    .to_string(),
            );
        }

        tips
    }
}

fn feedback_for(score: u8) -> &'static str {
    match score {
        85..=u8::MAX => "Excellent! You are maintaining very healthy habits.",
        70..=84 => "Good job! A few small changes could make a big difference.",
        50..=69 => "Fair. There is room to improve several areas of your lifestyle.",
        _ => "Your health needs attention. Consider the tips below and consult a doctor.",
    }
}
