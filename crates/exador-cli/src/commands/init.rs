//! The `exador init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("exador.toml", SAMPLE_CONFIG)?;
    write_if_missing("questions.csv", SAMPLE_QUESTIONS)?;

    println!("\nNext steps:");
    println!("  1. Run: exador validate --csv questions.csv");
    println!("  2. Run: exador chapters --continent arithmia");
    println!("  3. Run: exador play --chapter <chapter id>");
    println!("  4. Switch [backend] to type = \"rest\" to use the hosted database");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# exador configuration

# How long a question's result stays on screen, in milliseconds.
result_pause_ms = 2000

# Countdown for questions without their own time limit. Omit for no limit.
# default_time_limit_secs = 60

[backend]
type = "memory"
seed_csv = "questions.csv"
student_name = "Explorateur"

# [backend]
# type = "rest"
# url = "https://your-project.example.org"
# api_key = "${EXADOR_API_KEY}"
# access_token = "${EXADOR_ACCESS_TOKEN}"
"#;

const SAMPLE_QUESTIONS: &str = "\
continent,chapter_code,difficulty,question_text,question_type,explanation,hint_1,hint_2,hint_3,option_a,option_b,option_c,option_d,correct_answer,points_base,competence_code,metadata
arithmia,ARI-01,facile,Combien font 2 + 2 ?,multiple_choice,Deux plus deux font quatre,Compte sur tes doigts,,,3,4,5,6,4,1,CE1-NUM-01,
arithmia,ARI-01,moyen,Combien font 3 x 3 ?,multiple_choice,Trois fois trois font neuf,Pense à la table de 3,Trois groupes de trois,,6,9,12,,9,2,CE1-NUM-02,
arithmia,ARI-01,piege,Quelle est la moitié de 2 + 2 ?,free_text,La moitié de 2 vaut 1 puis on ajoute 2,Attention à l'ordre des opérations,,,,,,,3,8,CE1-NUM-03,
geometria,GEO-01,moyen,Combien de côtés a un triangle ?,multiple_choice,Tri veut dire trois,,,,2,3,4,,3,2,CE2-GEO-01,
";
