use crate::types::{ChapterRef, PlanRequest};

static PLAN_PROMPT: &str = r#"
Tu es un concepteur pédagogique expert.
Génère un plan de formation complet au format JSON.
Sujet : "{subject}"
Niveau de l'apprenant : {level}.
Points à approfondir : {focus_points}.
Temps disponible : {time_per_day} par jour pendant {duration}.

La structure JSON exacte attendue :
{
  "modules": [
    {
      "title": "Nom du module",
      "chapters": [
        {
          "title": "Nom du chapitre",
          "summary": "Résumé en 2-3 phrases"
        }
      ]
    }
  ],
  "planning": [
    {
      "week": 1,
      "focus": "Objectif de la semaine"
    }
  ],
  "resources": [
    {
      "title": "Nom de la ressource",
      "url": "https://..."
    }
  ]
}

Renvoie uniquement du JSON valide, sans explication.
"#;

static LESSON_HTML_PROMPT: &str = r#"
Tu es un expert pédagogique très expérimenté.

Génère un contenu complet, clair, détaillé et structuré avec des paragraphes pour le chapitre suivant.
Explique les concepts avec des exemples concrets, des analogies et des illustrations quand c'est possible.
Détaille bien chaque point important pour que l'apprenant comprenne parfaitement.

Titre du chapitre : "{chapter_title}"
Résumé : "{chapter_summary}"

Structure demandée en HTML :
<h2>Cours détaillé</h2>
<p class="lesson">... (contenu pédagogique clair, pas trop verbeux)</p>

<h2>Exercices pratiques</h2>
<ul>
  <li>Exercice 1 (étape par étape)</li>
  <li>Exercice 2</li>
</ul>

<h2>Mini-projet</h2>
<p>Décris un mini-projet réalisable en 1-3 heures (objectifs + étapes)</p>

<h2>Ressources complémentaires</h2>
<ul>
  <li><a href="https://...">Ressource 1</a></li>
</ul>

Renvoie uniquement l'HTML demandé (commence par les balises).
"#;

static LESSON_JSON_PROMPT: &str = r#"
Tu es un expert pédagogique très expérimenté.

Génère un contenu complet, clair, détaillé et structuré avec des paragraphes pour le chapitre suivant.
Explique les concepts avec des exemples concrets, des analogies et des illustrations quand c'est possible.
Détaille bien chaque point important pour que l'apprenant comprenne parfaitement au format JSON.

Titre du chapitre : "{chapter_title}"
Résumé : "{chapter_summary}"

Structure JSON attendue :
{
  "chapter_title": "...",
  "lesson": "Texte du cours (quelques paragraphes)",
  "exercises": [
    "Instruction exercice 1",
    "Instruction exercice 2"
  ],
  "mini_project": {
    "title": "...",
    "description": "...",
    "steps": ["étape 1", "étape 2"]
  },
  "resources": [
    { "title": "Nom", "url": "https://..." }
  ]
}

Renvoie uniquement du JSON valide.
"#;

static QUIZ_PROMPT: &str = r#"
Tu es un expert pédagogique.

Génère 10 questions de quiz à choix multiples basées sur ce chapitre.

Chapitre : "{chapter_title}"
Résumé : "{chapter_summary}"

Pour chaque question, fournis :
- La question ("question")
- Les options ("options", liste de chaînes)
- La bonne réponse ("answer")
- Une explication pour chaque option (bonne ou mauvaise) sous forme d'un objet "explanations" où la clé est l'option et la valeur l'explication.

Format JSON attendu :
[
  {
    "question": "Question 1 ... ?",
    "options": ["option1", "option2", "option3"],
    "answer": "option1",
    "explanations": {
      "option1": "Cette réponse est correcte parce que ...",
      "option2": "Cette réponse est incorrecte parce que ...",
      "option3": "Cette réponse est incorrecte parce que ..."
    }
  }
]

Renvoie uniquement du JSON valide.
"#;

/// Which piece of chapter content a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterPrompt {
    LessonHtml,
    LessonJson,
    Quiz,
}

impl ChapterPrompt {
    fn template(self) -> &'static str {
        match self {
            ChapterPrompt::LessonHtml => LESSON_HTML_PROMPT,
            ChapterPrompt::LessonJson => LESSON_JSON_PROMPT,
            ChapterPrompt::Quiz => QUIZ_PROMPT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChapterPrompt::LessonHtml => "lesson_html",
            ChapterPrompt::LessonJson => "lesson_json",
            ChapterPrompt::Quiz => "quiz",
        }
    }

    pub fn render(self, chapter: &ChapterRef) -> String {
        self.template()
            .replace("{chapter_title}", &chapter.title)
            .replace("{chapter_summary}", &chapter.summary)
    }
}

pub fn plan_prompt(req: &PlanRequest) -> String {
    PLAN_PROMPT
        .replace("{subject}", &req.subject)
        .replace("{level}", &req.level)
        .replace("{focus_points}", &req.focus_points.join(", "))
        .replace("{time_per_day}", &req.time_per_day)
        .replace("{duration}", &req.duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_prompt_fills_every_placeholder() {
        let prompt = plan_prompt(&PlanRequest {
            subject: "Rust".to_string(),
            level: "débutant".to_string(),
            focus_points: vec!["ownership".to_string(), "traits".to_string()],
            time_per_day: "1h".to_string(),
            duration: "4 semaines".to_string(),
        });
        assert!(prompt.contains("Sujet : \"Rust\""));
        assert!(prompt.contains("ownership, traits"));
        assert!(prompt.contains("1h par jour pendant 4 semaines"));
        assert!(!prompt.contains("{subject}"));
    }

    #[test]
    fn chapter_prompts_embed_title_and_summary() {
        let chapter = ChapterRef {
            title: "Les Bases du Python".to_string(),
            summary: "Variables et types.".to_string(),
        };
        for kind in [
            ChapterPrompt::LessonHtml,
            ChapterPrompt::LessonJson,
            ChapterPrompt::Quiz,
        ] {
            let prompt = kind.render(&chapter);
            assert!(prompt.contains("\"Les Bases du Python\""), "{}", kind.name());
            assert!(prompt.contains("\"Variables et types.\""), "{}", kind.name());
        }
    }
}
